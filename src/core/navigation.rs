//! Navigation over the home drive and mounted shared folders.
//!
//! The position is a [`NavigationState`]: the registry slot of the active
//! session plus a stack of folder frames. Frames hold the keys they were
//! entered through and are re-resolved against the active session's current
//! document, so concurrent edits are seen on the next access.
//!
//! `cd` destinations are applied segment by segment to a working copy of the
//! state, which replaces the current state only if every segment succeeded.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use serde_json::{Map, Value};

use crate::core::error::FsError;
use crate::core::path;
use crate::core::resolver::{Entry, EntryResolver, LookupMode, TitleIndex};
use crate::models::{Address, DriveDoc, SharedFolderMeta};
use crate::sync::{HOME_SLOT, Session, SessionRegistry};

// =============================================================================
// State
// =============================================================================

/// A folder entered from its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Key of the folder in its parent
    pub name: String,
}

/// Where the user currently is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Registry slot of the active session
    pub slot: usize,
    /// Display title of the mounted shared folder (None at home)
    pub mount_title: Option<String>,
    /// Folders entered below the active session's root
    pub stack: Vec<Frame>,
}

impl NavigationState {
    fn reset_home(&mut self) {
        self.slot = HOME_SLOT;
        self.mount_title = None;
        self.stack.clear();
    }

    fn enter_shared(&mut self, slot: usize, title: String) {
        self.slot = slot;
        self.mount_title = Some(title);
        self.stack.clear();
    }

    /// Whether a shared folder is mounted. A mount may share the home slot
    /// when its link points back at the home drive.
    fn mounted(&self) -> bool {
        self.mount_title.is_some() || self.slot != HOME_SLOT
    }

    fn ascend(&mut self) {
        if self.stack.pop().is_none() && self.mounted() {
            self.reset_home();
        }
    }

    fn keys(&self) -> Vec<&str> {
        self.stack.iter().map(|f| f.name.as_str()).collect()
    }

    /// Display path: `/A/B` at home, `<title>:/A/B` inside a shared folder.
    fn display_path(&self) -> String {
        let folders = format!("/{}", self.keys().join("/"));
        match &self.mount_title {
            Some(title) => format!("{}:{}", title, folders),
            None => folders,
        }
    }

    /// Coarse position, for display and logging.
    pub fn location(&self) -> Location {
        if self.mounted() {
            Location::InSharedSession
        } else if self.stack.is_empty() {
            Location::AtRoot
        } else {
            Location::InFolder(self.stack.len())
        }
    }
}

/// Coarse position of a [`NavigationState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    AtRoot,
    InFolder(usize),
    InSharedSession,
}

/// Outcome of a successful `cd`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Shared folder entered by the last segment, with its resolved address
    pub mounted: Option<(String, Address)>,
}

/// Owned result of resolving one segment.
enum Step {
    Folder(String),
    File,
    Shared { title: String, href: Option<String> },
}

// =============================================================================
// Engine
// =============================================================================

/// Moves a [`NavigationState`] through the drive and its shared folders.
pub struct NavigationEngine {
    registry: SessionRegistry,
    state: NavigationState,
    origin: String,
    titles: Mutex<Option<(Arc<Value>, Arc<TitleIndex>)>>,
}

impl NavigationEngine {
    /// Start at the root of the registry's home drive.
    ///
    /// `origin` resolves relative shared-folder links.
    pub fn new(registry: SessionRegistry, origin: impl Into<String>) -> Self {
        Self {
            registry,
            state: NavigationState::default(),
            origin: origin.into(),
            titles: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Origin relative links are resolved against.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The session navigation currently happens in.
    pub fn active(&self) -> &Session {
        self.registry
            .get(self.state.slot)
            .unwrap_or_else(|| self.registry.home())
    }

    /// Wait until the active session is ready.
    pub async fn ensure_ready(&self) -> Result<(), FsError> {
        self.registry.await_ready(self.state.slot).await?;
        Ok(())
    }

    /// Display path: `/A/B` at home, `<title>:/A/B` inside a shared folder.
    pub fn path(&self) -> String {
        self.state.display_path()
    }

    /// Run `f` against the current folder of the active session.
    ///
    /// Fails with [`FsError::PathNotFound`] if a folder on the stack was
    /// removed since it was entered.
    pub fn with_current<R>(
        &self,
        f: impl for<'a> FnOnce(&EntryResolver<'a>, &'a Map<String, Value>) -> R,
    ) -> Result<R, FsError> {
        self.with_folder(&self.state, f)
    }

    fn with_folder<R>(
        &self,
        state: &NavigationState,
        f: impl for<'a> FnOnce(&EntryResolver<'a>, &'a Map<String, Value>) -> R,
    ) -> Result<R, FsError> {
        let session = self.registry.get(state.slot).unwrap_or_else(|| self.registry.home());
        let empty_doc = Value::Object(Map::new());
        let snapshot = session.document();
        let doc = snapshot.as_deref().unwrap_or(&empty_doc);
        let drive = DriveDoc::new(doc).or_else(|| DriveDoc::new(&empty_doc));
        let Some(drive) = drive else {
            return Err(FsError::PathNotFound(state.display_path()));
        };

        let titles = match &snapshot {
            Some(doc) => self.title_index(doc, drive),
            None => Arc::new(TitleIndex::default()),
        };
        let resolver = EntryResolver::new(drive, &titles);

        let empty = Map::new();
        let container = match drive.folder_at(&state.keys()) {
            Some(folder) => folder,
            None if state.stack.is_empty() => &empty,
            None => return Err(FsError::PathNotFound(state.display_path())),
        };
        Ok(f(&resolver, container))
    }

    /// Title index of `doc`, rebuilt when the snapshot changes.
    fn title_index(&self, doc: &Arc<Value>, drive: DriveDoc<'_>) -> Arc<TitleIndex> {
        let mut cache = self.titles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached, index)) = cache.as_ref() {
            if Arc::ptr_eq(cached, doc) {
                return index.clone();
            }
        }
        let index = Arc::new(TitleIndex::build(drive));
        *cache = Some((doc.clone(), index.clone()));
        index
    }

    /// Change directory to `to`.
    ///
    /// The state is only updated if every segment applies.
    pub async fn change_dir(&mut self, to: &str) -> Result<Transition, FsError> {
        let mut work = self.state.clone();
        let transition = self.apply(&mut work, to).await?;

        debug!("navigation {:?} -> {:?}", self.state.location(), work.location());
        self.state = work;
        Ok(transition)
    }

    async fn apply(&mut self, work: &mut NavigationState, to: &str) -> Result<Transition, FsError> {
        let (absolute, segments) = path::segments(to);
        if absolute {
            work.reset_home();
        }

        let mut transition = Transition { mounted: None };
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            match *segment {
                "." => {}
                ".." => work.ascend(),
                name => match self.step(work, name)? {
                    Step::Folder(key) => work.stack.push(Frame { name: key }),
                    Step::File => {
                        return Err(FsError::NotAFolder(
                            name.to_string(),
                            "cannot navigate into a file",
                        ));
                    }
                    Step::Shared { .. } if i != last => {
                        return Err(FsError::NotAFolder(
                            name.to_string(),
                            "a shared folder must be the last path segment",
                        ));
                    }
                    Step::Shared { href: None, .. } => {
                        return Err(FsError::NotAFolder(
                            name.to_string(),
                            "shared folder has no link",
                        ));
                    }
                    Step::Shared {
                        title,
                        href: Some(href),
                    } => {
                        let address = Address::resolve(&href, &self.origin);
                        let slot = self.registry.get_or_connect(&address).await?;
                        self.registry.await_ready(slot).await?;
                        info!("entered shared folder {} ({})", title, address);
                        work.enter_shared(slot, title.clone());
                        transition.mounted = Some((title, address));
                    }
                },
            }
        }

        Ok(transition)
    }

    fn step(&self, state: &NavigationState, name: &str) -> Result<Step, FsError> {
        self.with_folder(state, |resolver, container| {
            match resolver.resolve(container, name, LookupMode::Navigate) {
                Some(Entry::Folder { key, .. }) => Ok(Step::Folder(key)),
                Some(Entry::File { .. }) => Ok(Step::File),
                Some(Entry::SharedFolder { meta, .. }) => {
                    let meta = SharedFolderMeta::from_value(meta);
                    Ok(Step::Shared {
                        title: meta.display_title().unwrap_or(name).to_string(),
                        href: meta.href,
                    })
                }
                None => Err(FsError::PathNotFound(name.to_string())),
            }
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MemoryConnector;
    use serde_json::json;
    use std::time::Duration;

    const HOME: &str = "http://h/drive/#/2/drive/edit/AAAAAAAAAAAAAAAAAAAAAAAA/";
    const TEAM: &str = "http://h/drive/#/2/drive/edit/BBBBBBBBBBBBBBBBBBBBBBBB/";

    fn home_doc() -> Value {
        json!({
            "drive": {
                "root": {
                    "Notes": { "Sub": { "deep.txt": "d2" }, "report.txt": "doc123" },
                    "Archive": {},
                    "team": "sf1"
                },
                "filesData": {
                    "doc123": { "title": "Report" },
                    "d2": { "title": "Deep" }
                },
                "sharedFolders": {
                    "sf1": { "title": "Team", "lastTitle": "Team Space", "href": "/drive/#/2/drive/edit/BBBBBBBBBBBBBBBBBBBBBBBB/" }
                }
            }
        })
    }

    fn team_doc() -> Value {
        json!({ "root": { "Plans": { "q1": "t1" } }, "filesData": { "t1": { "title": "Q1" } } })
    }

    async fn engine(connector: MemoryConnector) -> (NavigationEngine, Arc<MemoryConnector>) {
        let connector = Arc::new(connector);
        let registry = SessionRegistry::with_home(
            connector.clone(),
            &Address::parse(HOME),
            Duration::from_secs(30),
        )
        .await
        .unwrap();
        let engine = NavigationEngine::new(registry, "http://h");
        engine.ensure_ready().await.unwrap();
        (engine, connector)
    }

    fn connector() -> MemoryConnector {
        MemoryConnector::new()
            .with_document(HOME, home_doc())
            .with_document(TEAM, team_doc())
    }

    #[tokio::test]
    async fn test_descend_and_ascend() {
        let (mut nav, _) = engine(connector()).await;
        assert_eq!(nav.path(), "/");
        assert_eq!(nav.state().location(), Location::AtRoot);

        nav.change_dir("Notes").await.unwrap();
        assert_eq!(nav.path(), "/Notes");
        nav.change_dir("Sub").await.unwrap();
        assert_eq!(nav.state().location(), Location::InFolder(2));
        nav.change_dir("..").await.unwrap();
        assert_eq!(nav.path(), "/Notes");
        nav.change_dir("../..").await.unwrap();
        assert_eq!(nav.path(), "/");
    }

    #[tokio::test]
    async fn test_multi_segment_and_absolute() {
        let (mut nav, _) = engine(connector()).await;
        nav.change_dir("Notes/./Sub").await.unwrap();
        assert_eq!(nav.path(), "/Notes/Sub");
        nav.change_dir("/Archive").await.unwrap();
        assert_eq!(nav.path(), "/Archive");
        nav.change_dir("/").await.unwrap();
        assert_eq!(nav.path(), "/");
    }

    #[tokio::test]
    async fn test_failed_cd_rolls_back() {
        let (mut nav, _) = engine(connector()).await;
        nav.change_dir("Notes").await.unwrap();

        let err = nav.change_dir("../Archive/Missing").await.unwrap_err();
        assert_eq!(err, FsError::PathNotFound("Missing".into()));
        assert_eq!(nav.path(), "/Notes");

        let err = nav.change_dir("report.txt").await.unwrap_err();
        assert!(matches!(err, FsError::NotAFolder(..)));
        assert_eq!(nav.path(), "/Notes");
    }

    #[tokio::test]
    async fn test_enter_shared_folder_by_key_and_title() {
        let (mut nav, connector) = engine(connector()).await;

        let t = nav.change_dir("team").await.unwrap();
        let (title, address) = t.mounted.unwrap();
        assert_eq!(title, "Team Space");
        assert_eq!(address, Address::parse(TEAM));
        assert_eq!(nav.path(), "Team Space:/");
        assert_eq!(nav.state().location(), Location::InSharedSession);
        let slot = nav.state().slot;

        nav.change_dir("Plans").await.unwrap();
        assert_eq!(nav.path(), "Team Space:/Plans");
        nav.change_dir("..").await.unwrap();
        assert_eq!(nav.path(), "Team Space:/");
        nav.change_dir("..").await.unwrap();
        assert_eq!(nav.path(), "/");

        nav.change_dir("Team Space").await.unwrap();
        assert_eq!(nav.state().slot, slot);
        assert_eq!(connector.stats(TEAM).opened, 1);
    }

    #[tokio::test]
    async fn test_mount_of_home_drive_can_be_left() {
        let mut doc = home_doc();
        doc["drive"]["root"]["alias"] = json!("sf0");
        doc["drive"]["sharedFolders"]["sf0"] =
            json!({ "title": "Alias", "href": "/drive/#/2/drive/edit/AAAAAAAAAAAAAAAAAAAAAAAA/" });
        let (mut nav, connector) = engine(MemoryConnector::new().with_document(HOME, doc)).await;

        nav.change_dir("alias").await.unwrap();
        assert_eq!(nav.state().slot, HOME_SLOT);
        assert_eq!(nav.path(), "Alias:/");
        assert_eq!(nav.state().location(), Location::InSharedSession);

        nav.change_dir("Notes").await.unwrap();
        assert_eq!(nav.path(), "Alias:/Notes");
        nav.change_dir("../..").await.unwrap();
        assert_eq!(nav.path(), "/");
        assert_eq!(nav.state().location(), Location::AtRoot);
        assert_eq!(connector.stats(HOME).opened, 1);
    }

    #[tokio::test]
    async fn test_missing_folder_is_named_from_given_state() {
        let (nav, _) = engine(connector()).await;
        let stale = NavigationState {
            stack: vec![Frame { name: "Gone".into() }],
            ..NavigationState::default()
        };
        let err = nav.with_folder(&stale, |_, c| c.len()).unwrap_err();
        assert_eq!(err, FsError::PathNotFound("/Gone".into()));
        assert_eq!(nav.path(), "/");
    }

    #[tokio::test]
    async fn test_shared_folder_must_be_last() {
        let (mut nav, _) = engine(connector()).await;
        let err = nav.change_dir("team/Plans").await.unwrap_err();
        assert!(matches!(err, FsError::NotAFolder(..)));
        assert_eq!(nav.path(), "/");
    }

    #[tokio::test]
    async fn test_failed_mount_keeps_state() {
        let (mut nav, _) = engine(connector().with_failure(TEAM, "no access")).await;
        nav.change_dir("Notes").await.unwrap();
        let err = nav.change_dir("/team").await.unwrap_err();
        assert!(matches!(err, FsError::Session(_)));
        assert_eq!(nav.path(), "/Notes");
    }

    #[tokio::test]
    async fn test_removed_folder_is_reported() {
        let connector = connector().with_update(
            HOME,
            Duration::from_millis(50),
            json!({ "drive": { "root": {} } }),
            true,
        );
        let (mut nav, _) = engine(connector).await;
        nav.change_dir("Notes").await.unwrap();

        let mut changes = nav.active().changes();
        changes.changed().await.unwrap();
        let err = nav.with_current(|_, c| c.len()).unwrap_err();
        assert_eq!(err, FsError::PathNotFound("/Notes".into()));

        nav.change_dir("/").await.unwrap();
        assert_eq!(nav.with_current(|_, c| c.len()).unwrap(), 0);
    }
}
