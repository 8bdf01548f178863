use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::config::Settings;
use crate::core::error::FsError;
use crate::core::fetcher::{ContentFetcher, ReadResult};
use crate::core::navigation::NavigationEngine;
use crate::core::path;
use crate::core::resolver::{Entry, LookupMode};
use crate::models::{Address, FileMeta, OutputLine, SharedFolderMeta};
use crate::sync::{Connector, SessionRegistry};

/// Kind of an entry returned by [`DriveFs::stat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Dir,
}

/// Outcome of [`DriveFs::change_dir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeDir {
    /// Working directory token for the shell; always `/`
    pub path: String,
    /// Human readable summary of the move
    pub message: String,
}

/// Filesystem view of a drive and the shared folders mounted in it.
///
/// # Path Convention
///
/// The drive tracks its own position, so the `path`/`from` arguments are the
/// shell's working directory token and must normalize to `/`. Names are
/// resolved against the current folder only.
pub struct DriveFs {
    nav: NavigationEngine,
    fetcher: ContentFetcher,
}

impl DriveFs {
    /// Connect to the home drive at `drive` and wait until it is ready.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        drive: &Address,
        settings: &Settings,
    ) -> Result<Self, FsError> {
        let registry =
            SessionRegistry::with_home(connector.clone(), drive, settings.connect_timeout())
                .await?;
        let nav = NavigationEngine::new(registry, settings.server_origin(drive.as_str()));
        nav.ensure_ready().await?;
        info!("home drive {} ready", drive);

        Ok(Self {
            nav,
            fetcher: ContentFetcher::new(connector, settings.fetch_options()),
        })
    }

    /// Navigation engine backing this filesystem.
    pub fn navigation(&self) -> &NavigationEngine {
        &self.nav
    }

    pub fn normalize(path: &str) -> String {
        path::normalize(path)
    }

    pub fn join(base: &str, rel: &str) -> String {
        path::join(base, rel)
    }

    pub fn is_sub_path(parent: &str, child: &str) -> bool {
        path::is_sub_path(parent, child)
    }

    /// Only the working directory itself is known to exist.
    pub fn stat(&self, path: &str) -> Option<FileType> {
        (path::normalize(path) == "/").then_some(FileType::Dir)
    }

    /// Display path of the current folder.
    pub fn get_path(&self) -> String {
        self.nav.path()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Sorted names in the current folder.
    pub fn list(&self, path: &str) -> Result<Vec<String>, FsError> {
        require_cwd(path)?;
        self.nav.with_current(|_, container| sorted_keys(container))
    }

    /// Listing lines with the title column and styling.
    pub fn list_display(&self, path: &str) -> Result<Vec<OutputLine>, FsError> {
        require_cwd(path)?;
        self.nav.with_current(|resolver, container| {
            let names = sorted_keys(container);
            let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0) + 2;

            names
                .into_iter()
                .map(|name| {
                    let value = &container[&name];
                    match resolver.classify(&name, value) {
                        Some(Entry::Folder { .. }) => OutputLine::dir_entry(name, width),
                        Some(Entry::SharedFolder { meta, .. }) => {
                            let title = SharedFolderMeta::from_value(meta)
                                .display_title()
                                .map(str::to_string);
                            OutputLine::shared_entry(name, title, width)
                        }
                        Some(Entry::File { meta, .. }) => {
                            OutputLine::file_entry(name, FileMeta::from_value(meta).title, width)
                        }
                        None => OutputLine::file_entry(name, None, width),
                    }
                })
                .collect()
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Metadata of `name`: a folder's own mapping, or the table entry of a
    /// document or shared folder.
    pub fn info(&self, from: &str, name: &str) -> Result<Value, FsError> {
        require_cwd(from)?;
        if name.is_empty() {
            return Err(FsError::Usage("info <name>"));
        }
        self.nav
            .with_current(|resolver, container| {
                match resolver.resolve(container, name, LookupMode::Lookup) {
                    Some(Entry::Folder { node, .. }) => Some(Value::Object(node.clone())),
                    Some(Entry::File { meta, .. }) | Some(Entry::SharedFolder { meta, .. }) => {
                        Some(meta.clone())
                    }
                    None => None,
                }
            })?
            .ok_or_else(|| FsError::PathNotFound(name.to_string()))
    }

    /// Read the document `name`.
    ///
    /// A document that does not settle in time yields a result without
    /// content rather than an error. `printer` receives a progress line.
    pub async fn cat(
        &self,
        from: &str,
        name: &str,
        printer: Option<&mut dyn FnMut(&str)>,
    ) -> Result<ReadResult, FsError> {
        require_cwd(from)?;
        if name.is_empty() {
            return Err(FsError::Usage("cat <name>"));
        }

        let (title, link) = self.nav.with_current(|resolver, container| {
            match resolver.resolve(container, name, LookupMode::Lookup) {
                Some(Entry::File { meta, .. }) => {
                    let meta = FileMeta::from_value(meta);
                    let link = meta.link().map(str::to_string);
                    Ok((meta.title.unwrap_or_else(|| name.to_string()), link))
                }
                Some(_) => Err(FsError::NotAFile(name.to_string())),
                None => Err(FsError::PathNotFound(name.to_string())),
            }
        })??;

        let link = link.ok_or_else(|| FsError::NoLink(name.to_string()))?;
        let address = Address::resolve(&link, self.nav.origin());
        if let Some(print) = printer {
            print(&format!("Fetching {} ...", title));
        }
        debug!("cat {} -> {}", name, address);

        Ok(self.fetcher.fetch(&address).await)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Change the current folder.
    ///
    /// Fails without moving if any segment of `to` does not apply.
    pub async fn change_dir(&mut self, from: &str, to: &str) -> Result<ChangeDir, FsError> {
        require_cwd(from)?;
        if to.is_empty() {
            return Err(FsError::Usage("cd <path>"));
        }

        let transition = self.nav.change_dir(to).await?;
        let state = self.nav.state();
        let message = match (transition.mounted, state.stack.last(), &state.mount_title) {
            (Some((title, address)), _, _) => {
                format!("Changed folder to {}\nURL: {}", title, address)
            }
            (None, Some(frame), _) => format!("Changed folder to {}", frame.name),
            (None, None, Some(title)) => format!("Changed folder to {}", title),
            (None, None, None) => "Changed to root folder".to_string(),
        };

        Ok(ChangeDir {
            path: "/".to_string(),
            message,
        })
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Names in the current folder starting with `partial`.
    pub fn complete(&self, path: &str, partial: &str) -> Vec<String> {
        if require_cwd(path).is_err() {
            return Vec::new();
        }
        self.nav
            .with_current(|_, container| {
                sorted_keys(container)
                    .into_iter()
                    .filter(|name| name.starts_with(partial))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `cd` targets starting with `partial`: folders, shared-folder keys and
    /// shared-folder titles.
    pub fn complete_cd(&self, path: &str, partial: &str) -> Vec<String> {
        if require_cwd(path).is_err() {
            return Vec::new();
        }
        self.nav
            .with_current(|resolver, container| {
                let mut names: Vec<String> = container
                    .iter()
                    .filter(|&(key, value)| {
                        matches!(
                            resolver.classify(key, value),
                            Some(Entry::Folder { .. } | Entry::SharedFolder { .. })
                        )
                    })
                    .map(|(key, _)| key.clone())
                    .chain(resolver.titles().shared_titles().map(str::to_string))
                    .filter(|name| name.starts_with(partial))
                    .collect();
                names.sort();
                names.dedup();
                names
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn read_file(&self, _path: &str) -> Result<String, FsError> {
        Err(FsError::NotImplemented("read_file"))
    }

    pub fn make_dir(&mut self, _path: &str) -> Result<(), FsError> {
        Err(FsError::NotImplemented("make_dir"))
    }
}

fn require_cwd(path: &str) -> Result<(), FsError> {
    if path::normalize(path) == "/" {
        Ok(())
    } else {
        Err(FsError::UnsupportedPath(path.to_string()))
    }
}

fn sorted_keys(container: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut names: Vec<String> = container.keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextStyle;
    use crate::sync::MemoryConnector;
    use serde_json::json;
    use std::time::Duration;

    const HOME: &str = "http://h/drive/#/2/drive/edit/AAAAAAAAAAAAAAAAAAAAAAAA/";
    const TEAM: &str = "http://h/drive/#/2/drive/edit/BBBBBBBBBBBBBBBBBBBBBBBB/";
    const TODO: &str = "http://h/pad/#/2/pad/view/DDDDDDDDDDDDDDDDDDDDDDDD/";

    fn home_doc() -> Value {
        json!({
            "drive": {
                "root": {
                    "Notes": { "report.txt": "doc123" },
                    "todo": 7,
                    "team": "sf1",
                    "dangling": "gone"
                },
                "filesData": {
                    "doc123": { "title": "Report", "href": "/code/#/2/code/edit/CCCCCCCCCCCCCCCCCCCCCCCC/" },
                    "7": { "title": "Todo list", "roHref": "/pad/#/2/pad/view/DDDDDDDDDDDDDDDDDDDDDDDD/" }
                },
                "sharedFolders": {
                    "sf1": { "title": "Team", "lastTitle": "Team Space", "href": "/drive/#/2/drive/edit/BBBBBBBBBBBBBBBBBBBBBBBB/" }
                }
            }
        })
    }

    fn settings() -> Settings {
        Settings {
            origin: Some("http://h".into()),
            ..Settings::default()
        }
    }

    async fn drive(connector: MemoryConnector) -> (DriveFs, Arc<MemoryConnector>) {
        let connector = Arc::new(connector.with_document(HOME, home_doc()));
        let fs = DriveFs::connect(connector.clone(), &Address::parse(HOME), &settings())
            .await
            .unwrap();
        (fs, connector)
    }

    #[tokio::test]
    async fn test_list_and_stat() {
        let (fs, _) = drive(MemoryConnector::new()).await;
        assert_eq!(fs.list("/").unwrap(), ["Notes", "dangling", "team", "todo"]);
        assert_eq!(fs.list("./").unwrap().len(), 4);
        assert_eq!(
            fs.list("/Notes").unwrap_err(),
            FsError::UnsupportedPath("/Notes".into())
        );
        assert_eq!(fs.stat("/"), Some(FileType::Dir));
        assert_eq!(fs.stat("/Notes"), None);
    }

    #[tokio::test]
    async fn test_list_display() {
        let (fs, _) = drive(MemoryConnector::new()).await;
        let lines = fs.list_display("/").unwrap();
        let styles: Vec<_> = lines
            .iter()
            .map(|l| match l {
                OutputLine::ListEntry { style, .. } => *style,
                _ => panic!("unexpected line {:?}", l),
            })
            .collect();
        assert_eq!(
            styles,
            [
                TextStyle::Directory,
                TextStyle::File,
                TextStyle::SharedFolder,
                TextStyle::File
            ]
        );
        assert_eq!(lines[0].to_string(), "\x1b[94mNotes     - Notes\x1b[0m");
        assert_eq!(lines[1].to_string(), "dangling");
        assert_eq!(lines[2].to_string(), "\x1b[34mteam      - Team Space\x1b[0m");
        assert_eq!(lines[3].to_string(), "todo      - Todo list");
    }

    #[tokio::test]
    async fn test_info() {
        let (fs, _) = drive(MemoryConnector::new()).await;
        assert_eq!(
            fs.info("/", "Notes").unwrap(),
            json!({ "report.txt": "doc123" })
        );
        assert_eq!(fs.info("/", "todo").unwrap()["title"], "Todo list");
        assert_eq!(fs.info("/", "Todo list").unwrap(), fs.info("/", "todo").unwrap());
        assert_eq!(fs.info("/", "Team Space").unwrap(), fs.info("/", "team").unwrap());
        assert_eq!(
            fs.info("/", "dangling").unwrap_err(),
            FsError::PathNotFound("dangling".into())
        );
        assert_eq!(fs.info("/", "").unwrap_err(), FsError::Usage("info <name>"));
        assert!(matches!(
            fs.info("/x", "todo").unwrap_err(),
            FsError::UnsupportedPath(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cat_uses_read_only_link() {
        let connector = MemoryConnector::new().with_document(TODO, json!({ "content": "milk" }));
        let (fs, connector) = drive(connector).await;

        let mut progress = Vec::new();
        let mut printer = |line: &str| progress.push(line.to_string());
        let result = fs.cat("/", "Todo list", Some(&mut printer)).await.unwrap();

        assert_eq!(result.address, TODO);
        assert_eq!(result.content.as_deref(), Some("milk"));
        assert_eq!(progress, ["Fetching Todo list ..."]);
        assert_eq!(connector.stats(TODO).stopped, 1);
    }

    #[tokio::test]
    async fn test_cat_rejects_non_files() {
        let (fs, _) = drive(MemoryConnector::new()).await;
        assert_eq!(
            fs.cat("/", "Notes", None).await.unwrap_err(),
            FsError::NotAFile("Notes".into())
        );
        assert_eq!(
            fs.cat("/", "team", None).await.unwrap_err(),
            FsError::NotAFile("team".into())
        );
        assert_eq!(
            fs.cat("/", "missing", None).await.unwrap_err(),
            FsError::PathNotFound("missing".into())
        );
    }

    #[tokio::test]
    async fn test_change_dir_messages() {
        let connector =
            MemoryConnector::new().with_document(TEAM, json!({ "root": { "Plans": {} } }));
        let (mut fs, _) = drive(connector).await;

        let moved = fs.change_dir("/", "Notes").await.unwrap();
        assert_eq!(moved.path, "/");
        assert_eq!(moved.message, "Changed folder to Notes");
        assert_eq!(fs.get_path(), "/Notes");

        let moved = fs.change_dir("/", "..").await.unwrap();
        assert_eq!(moved.message, "Changed to root folder");

        let moved = fs.change_dir("/", "team").await.unwrap();
        assert_eq!(moved.message, format!("Changed folder to Team Space\nURL: {}", TEAM));
        assert_eq!(fs.get_path(), "Team Space:/");

        fs.change_dir("/", "Plans").await.unwrap();
        let moved = fs.change_dir("/", "..").await.unwrap();
        assert_eq!(moved.message, "Changed folder to Team Space");

        assert_eq!(fs.change_dir("/", "").await.unwrap_err(), FsError::Usage("cd <path>"));
        assert!(matches!(
            fs.change_dir("/a", "b").await.unwrap_err(),
            FsError::UnsupportedPath(_)
        ));
    }

    #[tokio::test]
    async fn test_completion() {
        let (fs, _) = drive(MemoryConnector::new()).await;
        assert_eq!(fs.complete("/", "t"), ["team", "todo"]);
        assert_eq!(fs.complete("/", ""), fs.list("/").unwrap());
        assert_eq!(fs.complete_cd("/", ""), ["Notes", "Team Space", "team"]);
        assert_eq!(fs.complete_cd("/", "Te"), ["Team Space"]);
        assert!(fs.complete("/elsewhere", "t").is_empty());
    }

    #[tokio::test]
    async fn test_writes_not_implemented() {
        let (mut fs, _) = drive(MemoryConnector::new()).await;
        assert_eq!(
            fs.read_file("/x").unwrap_err(),
            FsError::NotImplemented("read_file")
        );
        assert_eq!(
            fs.make_dir("/x").unwrap_err(),
            FsError::NotImplemented("make_dir")
        );
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let connector = Arc::new(
            MemoryConnector::new().with_ready_delay(HOME, Duration::from_secs(5)),
        );
        let settings = Settings {
            connect_timeout_ms: 10,
            ..settings()
        };
        let err = DriveFs::connect(connector, &Address::parse(HOME), &settings)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            FsError::Session(crate::core::error::SessionError::ConnectTimeout { .. })
        ));
    }
}
