use std::path::{Path, PathBuf};
use log::debug;
use crate::command::{Command, Invocation};
use crate::error::{ConvError, ConvResult};
use crate::listing;

/// Extension of converted files
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Cached media layouts, keyed by the descriptor's `media_type` code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// Numbered `.blv` container fragments, each converted on its own
    Blv,
    /// Separate `video.m4s` / `audio.m4s` streams muxed into one file
    M4s,
}

impl MediaType {
    /// Look up the handler for a descriptor's media type code
    pub fn from_code(code: i64) -> ConvResult<Self> {
        match code {
            1 => Ok(MediaType::Blv),
            2 => Ok(MediaType::M4s),
            other => Err(ConvError::UnknownMediaType(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            MediaType::Blv => 1,
            MediaType::M4s => 2,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Blv => "blv",
            MediaType::M4s => "m4s",
        }
    }

    /// True for a regular file carrying this type's extension
    pub fn matches(self, path: &Path) -> bool {
        path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(self.extension())
    }

    /// Build transcoder invocations for the fragments under `data_dir`.
    ///
    /// `output` is the target file for the item; `Blv` writes one file per
    /// fragment beside it, suffixed with the fragment's stem.
    pub fn generate_commands(
        self,
        transcoder: &str,
        data_dir: &Path,
        output: &Path,
    ) -> ConvResult<Vec<Command>> {
        let commands = match self {
            MediaType::Blv => {
                let mut fragments: Vec<PathBuf> = listing::list_children(data_dir)?
                    .into_iter()
                    .filter(|p| self.matches(p))
                    .collect();
                // Fragments are numbered 0.blv, 1.blv, ..., 10.blv
                fragments.sort_by_key(|p| fragment_index(p));

                let mut commands = Vec::new();
                for fragment in fragments {
                    let stem = fragment
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let target = suffixed(output, &stem);
                    commands.push(copy_codec(transcoder, &[fragment], &target));
                }
                commands
            }
            MediaType::M4s => {
                // Existence is left to the transcoder
                let video = data_dir.join(format!("video.{}", self.extension()));
                let audio = data_dir.join(format!("audio.{}", self.extension()));
                vec![copy_codec(transcoder, &[video, audio], output)]
            }
        };

        debug!("{:?}: {} command(s) for {}", self, commands.len(), data_dir.display());
        Ok(commands)
    }
}

fn copy_codec(transcoder: &str, inputs: &[PathBuf], output: &Path) -> Command {
    let mut invocation = Invocation::new(transcoder);
    for input in inputs {
        invocation = invocation.arg("-i").arg(input.display().to_string());
    }
    invocation
        .arg("-codec")
        .arg("copy")
        .arg(output.display().to_string())
        .into()
}

/// Sort key: numeric stems by value, anything else after them by name
fn fragment_index(path: &Path) -> (u64, PathBuf) {
    let index = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(u64::MAX);
    (index, path.to_path_buf())
}

/// `dir/name.ext` -> `dir/name-suffix.ext`
fn suffixed(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}-{}", stem, suffix);
    if let Some(ext) = output.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    output.with_file_name(name)
}
