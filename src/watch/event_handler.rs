// src/watch/event_handler.rs

//! Turn raw `notify` events into engine events.

use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::engine::EngineEvent;
use crate::fs::FileSystem;

/// Classify one notification.
///
/// - directory creations (and directories renamed into place) become
///   [`EngineEvent::DirectoryCreated`];
/// - file creations, writes and renames into place become
///   [`EngineEvent::PathModified`];
/// - removals, renames away and access events are dropped.
///
/// Backends that cannot tell files from folders report `Any`/`Other`; those
/// are resolved with a `FileSystem` lookup, which may race with a later
/// removal. A path that has already vanished is treated as a file write,
/// which at worst bumps activity on its owner.
pub fn classify_event(event: &Event, fs: &dyn FileSystem) -> Vec<EngineEvent> {
    let paths = &event.paths;
    match event.kind {
        EventKind::Create(CreateKind::Folder) => paths.iter().map(|p| dir_created(p)).collect(),
        EventKind::Create(CreateKind::File) => paths.iter().map(|p| path_modified(p)).collect(),
        EventKind::Create(_) => paths.iter().map(|p| created(p, fs)).collect(),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => paths.iter().map(|p| created(p, fs)).collect(),
            // `Both` carries [from, to]; only the destination is new.
            RenameMode::Both => paths.get(1).map(|p| created(p, fs)).into_iter().collect(),
            RenameMode::From => Vec::new(),
            RenameMode::Any | RenameMode::Other => paths
                .iter()
                .filter(|p| fs.exists(p))
                .map(|p| created(p, fs))
                .collect(),
        },

        EventKind::Modify(_) | EventKind::Any => paths
            .iter()
            .filter(|p| !fs.is_dir(p))
            .map(|p| path_modified(p))
            .collect(),

        EventKind::Access(_) | EventKind::Remove(_) | EventKind::Other => Vec::new(),
    }
}

fn created(path: &Path, fs: &dyn FileSystem) -> EngineEvent {
    if fs.is_dir(path) {
        dir_created(path)
    } else {
        path_modified(path)
    }
}

fn dir_created(path: &Path) -> EngineEvent {
    EngineEvent::DirectoryCreated {
        path: path.to_path_buf(),
    }
}

fn path_modified(path: &Path) -> EngineEvent {
    EngineEvent::PathModified {
        path: path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, DataChange, MetadataKind, RemoveKind};

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    fn created_dir(p: &str) -> EngineEvent {
        EngineEvent::DirectoryCreated { path: p.into() }
    }

    fn modified(p: &str) -> EngineEvent {
        EngineEvent::PathModified { path: p.into() }
    }

    #[test]
    fn folder_and_file_creation() {
        let fs = MockFileSystem::new();
        assert_eq!(
            classify_event(
                &event(EventKind::Create(CreateKind::Folder), &["/mlartifacts/1/2/model"]),
                &fs
            ),
            vec![created_dir("/mlartifacts/1/2/model")]
        );
        assert_eq!(
            classify_event(
                &event(EventKind::Create(CreateKind::File), &["/mlartifacts/1/2/model/MLmodel"]),
                &fs
            ),
            vec![modified("/mlartifacts/1/2/model/MLmodel")]
        );
    }

    #[test]
    fn ambiguous_creation_asks_the_filesystem() {
        let fs = MockFileSystem::new();
        fs.add_dir("/r/mlartifacts/1/2/model");
        fs.add_file("/r/mlartifacts/1/2/model/conda.yaml", b"".to_vec());

        let out = classify_event(
            &event(
                EventKind::Create(CreateKind::Any),
                &["/r/mlartifacts/1/2/model", "/r/mlartifacts/1/2/model/conda.yaml"],
            ),
            &fs,
        );
        assert_eq!(
            out,
            vec![
                created_dir("/r/mlartifacts/1/2/model"),
                modified("/r/mlartifacts/1/2/model/conda.yaml"),
            ]
        );
    }

    #[test]
    fn writes_to_files_count_but_directory_touches_do_not() {
        let fs = MockFileSystem::new();
        fs.add_dir("/r/model");
        fs.add_file("/r/model/weights.bin", b"x".to_vec());

        let write = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/r/model/weights.bin"],
        );
        assert_eq!(classify_event(&write, &fs), vec![modified("/r/model/weights.bin")]);

        let touch = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/r/model"],
        );
        assert!(classify_event(&touch, &fs).is_empty());
    }

    #[test]
    fn renames_use_the_destination() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mlartifacts/1/2/model");

        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/mlartifacts/1/2/.tmp-model", "/mlartifacts/1/2/model"],
        );
        assert_eq!(classify_event(&both, &fs), vec![created_dir("/mlartifacts/1/2/model")]);

        let from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/mlartifacts/1/2/model"],
        );
        assert!(classify_event(&from, &fs).is_empty());

        let to_file = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/mlartifacts/1/2/model/MLmodel"],
        );
        assert_eq!(
            classify_event(&to_file, &fs),
            vec![modified("/mlartifacts/1/2/model/MLmodel")]
        );
    }

    #[test]
    fn unspecified_renames_of_vanished_paths_are_dropped() {
        let fs = MockFileSystem::new();
        let e = event(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["/gone"]);
        assert!(classify_event(&e, &fs).is_empty());
    }

    #[test]
    fn removals_and_reads_are_ignored() {
        let fs = MockFileSystem::new();
        for kind in [
            EventKind::Remove(RemoveKind::Folder),
            EventKind::Remove(RemoveKind::File),
            EventKind::Access(AccessKind::Read),
            EventKind::Other,
        ] {
            assert!(classify_event(&event(kind, &["/r/model/x"]), &fs).is_empty());
        }
    }
}
