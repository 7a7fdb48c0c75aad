use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::api::MetadataSource;
use crate::command::Command;
use crate::entry::{VideoInfo, ENTRY_FILE};
use crate::error::ConvResult;
use crate::executor::{command_queue, CommandSender, Dispatcher, Executor};
use crate::listing;
use crate::media::{MediaType, OUTPUT_EXTENSION};
use crate::resolver::Resolver;

/// Totals for a finished scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub roots: usize,
    pub items: usize,
    pub commands: usize,
    pub dispatched: usize,
}

/// Walks reference roots and feeds the generated commands to an executor
#[derive(Debug)]
pub struct Scanner<S> {
    resolver: Resolver<S>,
    transcoder: String,
    output_dir: PathBuf,
}

/// Expand download roots into reference roots: every child directory of each
/// `<root>` (one per downloaded asset) is scanned as a reference root.
pub fn expand_download_roots(download_roots: &[PathBuf]) -> ConvResult<Vec<PathBuf>> {
    let mut roots = Vec::new();
    for root in download_roots {
        let children = listing::list_child_dirs(root)?;
        debug!("{}: {} reference root(s)", root.display(), children.len());
        roots.extend(children);
    }
    Ok(roots)
}

impl<S: MetadataSource> Scanner<S> {
    pub fn new(resolver: Resolver<S>, transcoder: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            transcoder: transcoder.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    pub fn into_resolver(self) -> Resolver<S> {
        self.resolver
    }

    /// Scan every reference root in turn.
    ///
    /// Each root gets its own queue and executor; the root is finished only
    /// when the executor has stopped, so nothing queued is left behind. The
    /// first error from either side aborts the scan, and a failed executor
    /// stops the producer at its next suspension point.
    pub async fn scan<D: Dispatcher>(
        &mut self,
        reference_roots: &[PathBuf],
        dispatcher: &mut D,
    ) -> ConvResult<ScanSummary> {
        let mut summary = ScanSummary::default();

        for root in reference_roots {
            info!("scanning {}", root.display());
            let (queue, rx) = command_queue();
            let mut executor = Executor::new(rx, dispatcher);

            // The producer owns the sender; dropping it on failure closes the queue
            let this = &mut *self;
            let producer = async move {
                let produced = this.scan_root(root, &queue).await;
                drop(queue);
                produced
            };
            // Whichever half fails first cancels the other
            let ((items, commands), dispatched) = tokio::try_join!(producer, executor.run())?;

            summary.roots += 1;
            summary.items += items;
            summary.commands += commands;
            summary.dispatched += dispatched;
        }

        info!(
            "scan complete: {} root(s), {} item(s), {} command(s), {} dispatched",
            summary.roots, summary.items, summary.commands, summary.dispatched
        );
        Ok(summary)
    }

    /// Process every item folder of one reference root, enqueueing commands in
    /// generation order followed by `exit`.
    ///
    /// Returns `(items, commands)` enqueued. On error nothing more is enqueued
    /// for this root, `exit` included.
    pub async fn scan_root(&mut self, root: &Path, queue: &CommandSender) -> ConvResult<(usize, usize)> {
        let mut items = 0;
        let mut commands = 0;

        for item in listing::list_child_dirs(root)? {
            debug!("entry_path: {}", item.display());
            commands += self.scan_item(&item, queue).await?;
            items += 1;
        }

        queue.enqueue(Command::Exit)?;
        Ok((items, commands))
    }

    async fn scan_item(&mut self, item: &Path, queue: &CommandSender) -> ConvResult<usize> {
        let data_dir = find_data_dir(item)?;
        let mut info = self.resolver.resolve_entry(&item.join(ENTRY_FILE)).await?;
        let media_type = MediaType::from_code(info.media_type)?;

        let Some(data_dir) = data_dir else {
            warn!("{}: no data directory, nothing to convert", item.display());
            return Ok(0);
        };

        info.output_path = self.output_path(&info);
        let generated = media_type.generate_commands(&self.transcoder, &data_dir, &info.output_path)?;
        let count = generated.len();
        for command in generated {
            queue.enqueue(command)?;
        }
        Ok(count)
    }

    /// `<output_dir>/<owner> - <title>.mp4`
    fn output_path(&self, info: &VideoInfo) -> PathBuf {
        let name = format!("{} - {}", info.owner_name, info.title);
        self.output_dir
            .join(format!("{}.{}", sanitize_file_name(&name), OUTPUT_EXTENSION))
    }
}

/// First child directory of an item folder (by name); any others are ignored
fn find_data_dir(item: &Path) -> ConvResult<Option<PathBuf>> {
    let mut dirs = listing::list_child_dirs(item)?.into_iter();
    let first = dirs.next();
    let ignored: Vec<_> = dirs.collect();
    if let Some(first) = &first {
        if !ignored.is_empty() {
            warn!(
                "{}: using data directory {}, ignoring {:?}",
                item.display(),
                first.display(),
                ignored
            );
        }
    }
    Ok(first)
}

/// Replace characters that are not allowed in file names
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::OwnerCache;
    use crate::error::ConvError;
    use crate::executor::tests::FailingDispatcher;
    use crate::executor::PrintDispatcher;
    use crate::resolver::tests::FakeSource;
    use crate::resolver::UNKNOWN_OWNER;
    use serde_json::json;
    use std::fs;

    /// Lay out `<root>/<page>/entry.json` plus `<page>/<quality>/` fragments
    fn make_item(root: &Path, page_dir: &str, media_type: i64, avid: i64, page: i64, files: &[&str]) {
        let item = root.join(page_dir);
        let data = item.join("80");
        fs::create_dir_all(&data).unwrap();
        let entry = json!({
            "media_type": media_type,
            "title": "Foo",
            "page_data": {"page": page},
            "avid": avid,
            "owner_id": 7,
        });
        fs::write(item.join(ENTRY_FILE), entry.to_string()).unwrap();
        for file in files {
            fs::write(data.join(file), "").unwrap();
        }
    }

    fn scanner(source: FakeSource) -> Scanner<FakeSource> {
        Scanner::new(
            Resolver::new(OwnerCache::new("unused.json"), source),
            "ffmpeg",
            "out",
        )
    }

    fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<Command>) -> Vec<Command> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    #[tokio::test]
    async fn root_commands_are_followed_by_exit() {
        let root = tempfile::tempdir().unwrap();
        make_item(root.path(), "c_1", 2, 100, 1, &["video.m4s", "audio.m4s"]);
        make_item(root.path(), "c_2", 1, 100, 2, &["0.blv", "1.blv"]);

        let mut scanner = scanner(FakeSource::with_owner(100, 7, "Bob"));
        let (queue, rx) = command_queue();
        let (items, commands) = scanner.scan_root(root.path(), &queue).await.unwrap();
        assert_eq!((items, commands), (2, 3));

        let queued = drain(rx);
        assert_eq!(queued.len(), 4);
        assert_eq!(queued.last(), Some(&Command::Exit));
        let rendered: Vec<String> = queued.iter().map(|c| c.to_string()).collect();
        assert!(rendered[0].contains("video.m4s") && rendered[0].ends_with("\"out/Bob - Foo.mp4\""));
        assert!(rendered[1].contains("0.blv") && rendered[1].ends_with("\"out/Bob - Foo-p2-0.mp4\""));
        assert!(rendered[2].contains("1.blv") && rendered[2].ends_with("\"out/Bob - Foo-p2-1.mp4\""));

        // Owner fetched once, then served from cache for the second page
        assert_eq!(scanner.resolver().source().calls(), 1);
    }

    #[tokio::test]
    async fn unknown_media_type_aborts_root_without_enqueueing() {
        let root = tempfile::tempdir().unwrap();
        make_item(root.path(), "c_1", 9, 100, 1, &["video.m4s"]);
        make_item(root.path(), "c_2", 2, 100, 1, &["video.m4s", "audio.m4s"]);

        let mut scanner = scanner(FakeSource::with_owner(100, 7, "Bob"));
        let (queue, rx) = command_queue();
        let err = scanner.scan_root(root.path(), &queue).await.unwrap_err();

        assert!(matches!(err, ConvError::UnknownMediaType(9)));
        assert!(drain(rx).is_empty());
    }

    #[tokio::test]
    async fn fetch_error_aborts_remaining_items() {
        let root = tempfile::tempdir().unwrap();
        make_item(root.path(), "c_1", 2, 100, 1, &[]);
        make_item(root.path(), "c_2", 2, 200, 1, &[]);
        let source = FakeSource {
            failing: vec![100],
            ..FakeSource::with_owner(200, 8, "Dan")
        };

        let mut scanner = scanner(source);
        let (queue, rx) = command_queue();
        let err = scanner.scan_root(root.path(), &queue).await.unwrap_err();

        assert!(matches!(err, ConvError::MetadataFetch { aid: 100, .. }));
        assert!(drain(rx).is_empty());
        assert_eq!(scanner.resolver().source().calls(), 1);
    }

    #[tokio::test]
    async fn item_without_data_directory_yields_no_commands() {
        let root = tempfile::tempdir().unwrap();
        let item = root.path().join("c_1");
        fs::create_dir_all(&item).unwrap();
        fs::write(
            item.join(ENTRY_FILE),
            json!({"media_type": 2, "title": "t", "page_data": {"page": 1}, "avid": 1}).to_string(),
        )
        .unwrap();

        let mut scanner = scanner(FakeSource::default());
        let (queue, rx) = command_queue();
        assert_eq!(scanner.scan_root(root.path(), &queue).await.unwrap(), (1, 0));
        assert_eq!(drain(rx), vec![Command::Exit]);
    }

    #[test]
    fn first_data_directory_wins() {
        let item = tempfile::tempdir().unwrap();
        fs::create_dir(item.path().join("80")).unwrap();
        fs::create_dir(item.path().join("64")).unwrap();
        fs::write(item.path().join(ENTRY_FILE), "{}").unwrap();

        assert_eq!(find_data_dir(item.path()).unwrap(), Some(item.path().join("64")));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("a/b: c?"), "a_b_ c_");
        assert_eq!(sanitize_file_name(" 老番茄 - 标题 "), "老番茄 - 标题");
    }

    #[tokio::test]
    async fn scan_prints_every_root_in_order() {
        let download = tempfile::tempdir().unwrap();
        let asset_a = download.path().join("100");
        let asset_b = download.path().join("200");
        make_item(&asset_a, "c_1", 2, 100, 1, &["video.m4s", "audio.m4s"]);
        make_item(&asset_b, "c_1", 1, 200, 1, &["0.blv"]);

        let roots = expand_download_roots(&[download.path().to_path_buf()]).unwrap();
        assert_eq!(roots, vec![asset_a.clone(), asset_b.clone()]);

        let mut scanner = scanner(FakeSource::default());
        let mut dispatcher = PrintDispatcher::new(Vec::new());
        let summary = scanner.scan(&roots, &mut dispatcher).await.unwrap();

        assert_eq!(
            summary,
            ScanSummary { roots: 2, items: 2, commands: 2, dispatched: 2 }
        );
        let printed = String::from_utf8(dispatcher.into_inner()).unwrap();
        let lines: Vec<_> = printed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("exec: ffmpeg -i") && lines[0].contains("video.m4s"));
        assert!(lines[1].contains("0.blv"));
        assert!(lines[1].contains(UNKNOWN_OWNER));

        // Both assets were gone upstream; the fallback is cached under the hint
        let cache = scanner.into_resolver().into_cache();
        assert_eq!(cache.get(7), Some(UNKNOWN_OWNER));
    }

    #[tokio::test]
    async fn exec_failure_stops_remaining_lookups() {
        let root = tempfile::tempdir().unwrap();
        let items: usize = 5;
        for n in 0..items {
            let data = root.path().join(format!("c_{}", n)).join("80");
            fs::create_dir_all(&data).unwrap();
            fs::write(data.join("0.blv"), "").unwrap();
            let entry = json!({"media_type": 1, "title": "t", "page_data": {"page": 1}, "avid": n});
            fs::write(data.parent().unwrap().join(ENTRY_FILE), entry.to_string()).unwrap();
        }

        // No owner hints, so every item would need its own request
        let mut scanner = scanner(FakeSource::default());
        let err = scanner
            .scan(&[root.path().to_path_buf()], &mut FailingDispatcher)
            .await
            .unwrap_err();

        assert!(matches!(err, ConvError::Exec { .. }));
        assert!(
            scanner.resolver().source().calls() < items,
            "producer kept going after the executor failed: {} requests",
            scanner.resolver().source().calls()
        );
    }

    #[tokio::test]
    async fn scan_stops_at_first_failing_root() {
        let download = tempfile::tempdir().unwrap();
        let asset_a = download.path().join("100");
        let asset_b = download.path().join("200");
        make_item(&asset_a, "c_1", 5, 100, 1, &[]);
        make_item(&asset_b, "c_1", 1, 200, 1, &["0.blv"]);

        let mut scanner = scanner(FakeSource::with_owner(100, 7, "Bob"));
        let mut dispatcher = PrintDispatcher::new(Vec::new());
        let err = scanner
            .scan(&[asset_a, asset_b], &mut dispatcher)
            .await
            .unwrap_err();

        assert!(matches!(err, ConvError::UnknownMediaType(5)));
        assert!(dispatcher.into_inner().is_empty());
    }
}
