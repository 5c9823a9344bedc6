//! Incremental project passes in streaming mode.

mod common;

use common::{FakeCtags, PROJECT, Workspace, tag};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tagdex::config::ExtractionMode;
use tagdex::indexing::{FileChanges, IndexManager, IndexState, RequestAction};
use tagdex::types::{DeclarationKind, QualifiedName};

fn index_project(rebuild: bool) -> RequestAction {
    RequestAction::IndexProject {
        project: PROJECT.to_string(),
        rebuild,
    }
}

#[test]
fn test_second_pass_touches_nothing() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "int alpha(void) { return 1; }");
    let b = ws.write("b.h", "struct beta { int x; };");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("alpha", &a, 1, "function", &[])]);
    ctags.set_tags(
        &b,
        vec![
            tag("beta", &b, 1, "struct", &[]),
            tag("x", &b, 1, "member", &["struct:beta"]),
        ],
    );

    let manager = IndexManager::new(ws.context(ctags.clone(), ExtractionMode::Streaming));
    let first = manager.run_now(index_project(false)).unwrap();
    assert_eq!(first.files_indexed, 2);
    assert_eq!(first.required, 2);
    assert_eq!(first.declarations, 3);
    assert_eq!(ctags.streamed().len(), 2);

    let second = manager.run_now(index_project(false)).unwrap();
    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.required, 0);
    assert_eq!(ctags.streamed().len(), 2);

    let index = &manager.context().index;
    assert_eq!(index.stats().file_count, 2);
    assert_eq!(index.stats().declaration_count, 3);
    assert_eq!(
        manager.context().index_state(PROJECT),
        Some(IndexState::Consistent)
    );
}

#[test]
fn test_changed_file_is_retagged_alone() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "int old_name;");
    let b = ws.write("b.c", "int other;");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("old_name", &a, 1, "variable", &[])]);
    ctags.set_tags(&b, vec![tag("other", &b, 1, "variable", &[])]);

    let manager = IndexManager::new(ws.context(ctags.clone(), ExtractionMode::Streaming));
    manager.run_now(index_project(false)).unwrap();

    ctags.set_tags(&a, vec![tag("new_name", &a, 1, "variable", &[])]);
    ws.touch_later(&a);

    let summary = manager
        .run_now(RequestAction::UpdateFiles {
            project: PROJECT.to_string(),
            changes: FileChanges::new().with_changed([a.clone(), b.clone()]),
        })
        .unwrap();
    assert_eq!(summary.files_indexed, 1);
    assert_eq!(ctags.streamed().last(), Some(&a));

    let index = &manager.context().index;
    assert!(index.find_symbols("old_name").is_empty());
    assert_eq!(index.find_symbols("new_name").len(), 1);
    assert_eq!(index.find_symbols("other").len(), 1);
}

#[test]
fn test_commit_then_remove_leaves_no_trace() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "void gone(void);");
    let b = ws.write("b.c", "void kept(void);");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("gone", &a, 1, "prototype", &[])]);
    ctags.set_tags(&b, vec![tag("kept", &b, 1, "prototype", &[])]);

    let manager = IndexManager::new(ws.context(ctags.clone(), ExtractionMode::Streaming));
    manager.run_now(index_project(false)).unwrap();

    let summary = manager
        .run_now(RequestAction::RemoveFile {
            project: PROJECT.to_string(),
            path: a.clone(),
        })
        .unwrap();
    assert_eq!(summary.files_removed, 1);

    let index = &manager.context().index;
    assert!(index.find_symbols("gone").is_empty());
    assert_eq!(index.find_symbols("kept").len(), 1);
    assert_eq!(index.stats().file_count, 1);
}

#[test]
fn test_remove_folder_drops_every_file_under_it() {
    let ws = Workspace::new();
    let inner = ws.write("lib/inner.c", "int inner;");
    let outer = ws.write("main.c", "int outer;");

    let ctags = FakeCtags::new();
    ctags.set_tags(&inner, vec![tag("inner", &inner, 1, "variable", &[])]);
    ctags.set_tags(&outer, vec![tag("outer", &outer, 1, "variable", &[])]);

    let manager = IndexManager::new(ws.context(ctags, ExtractionMode::Streaming));
    manager.run_now(index_project(false)).unwrap();

    let summary = manager
        .run_now(RequestAction::RemoveFolder {
            project: PROJECT.to_string(),
            path: ws.root.join("lib"),
        })
        .unwrap();
    assert_eq!(summary.files_removed, 1);
    assert!(manager.context().index.find_symbols("inner").is_empty());
    assert_eq!(manager.context().index.find_symbols("outer").len(), 1);
}

#[test]
fn test_deleted_file_is_dropped_on_next_pass() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "int a;");
    let b = ws.write("b.c", "int b;");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("a", &a, 1, "variable", &[])]);
    ctags.set_tags(&b, vec![tag("b", &b, 1, "variable", &[])]);

    let manager = IndexManager::new(ws.context(ctags, ExtractionMode::Streaming));
    manager.run_now(index_project(false)).unwrap();

    fs::remove_file(&a).unwrap();
    let summary = manager.run_now(index_project(false)).unwrap();
    assert_eq!(summary.files_removed, 1);
    assert_eq!(summary.files_indexed, 0);
    assert!(manager.context().index.find_symbols("a").is_empty());
}

#[test]
fn test_rebuild_retags_unchanged_files() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "int a;");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("a", &a, 1, "variable", &[])]);

    let manager = IndexManager::new(ws.context(ctags.clone(), ExtractionMode::Streaming));
    manager.run_now(index_project(false)).unwrap();
    let summary = manager.run_now(index_project(true)).unwrap();

    assert_eq!(summary.files_indexed, 1);
    assert_eq!(ctags.streamed().len(), 2);
    assert_eq!(manager.context().index.find_symbols("a").len(), 1);
}

#[test]
fn test_tag_lines_map_to_qualified_declarations() {
    let ws = Workspace::new();
    let src = ws.write("shapes.cpp", "namespace geo { class Circle { double area(); }; }");

    let ctags = FakeCtags::new();
    ctags.set_tags(
        &src,
        vec![
            tag("geo", &src, 1, "namespace", &[]),
            tag("Circle", &src, 1, "class", &["namespace:geo"]),
            tag("area", &src, 1, "prototype", &["class:geo::Circle", "access:private"]),
            tag("errno", &src, 2, "externvar", &[]),
            tag("weird", &src, 3, "label", &[]),
            format!("nokind\t{}\t4;\"", src.display()),
        ],
    );

    let manager = IndexManager::new(ws.context(ctags, ExtractionMode::Streaming));
    let summary = manager
        .run_now(RequestAction::AddFile {
            project: PROJECT.to_string(),
            path: src.clone(),
        })
        .unwrap();
    assert_eq!(summary.declarations, 3);

    let index = &manager.context().index;
    let area = index.find_qualified(&QualifiedName::parse("geo::Circle::area"));
    assert_eq!(area.len(), 1);
    assert_eq!(area[0].kind, DeclarationKind::FunctionDeclaration);
    assert_eq!(area[0].line, 1);
    assert_eq!(index.file_path(&area[0]).as_deref(), Some(src.as_path()));

    let circle = index.find_symbols("Circle");
    assert_eq!(circle[0].name.to_string(), "geo::Circle");
    assert_eq!(circle[0].kind, DeclarationKind::Class);

    assert!(index.find_symbols("errno").is_empty());
    assert!(index.find_symbols("weird").is_empty());
    assert!(index.find_symbols("nokind").is_empty());
}

#[test]
fn test_failed_extraction_does_not_stop_the_pass() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "int a;");
    let b = ws.write("b.c", "int b;");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("a", &a, 1, "variable", &[])]);
    ctags.set_tags(&b, vec![tag("b", &b, 1, "variable", &[])]);
    ctags.fail_on(&a);

    let manager = IndexManager::new(ws.context(ctags.clone(), ExtractionMode::Streaming));
    let summary = manager.run_now(index_project(false)).unwrap();

    assert_eq!(ctags.streamed().len(), 2);
    assert_eq!(summary.required, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.files_indexed, 1);
    assert_eq!(summary.failures, 1);

    let context = manager.context();
    assert!(context.index.find_symbols("a").is_empty());
    assert_eq!(context.index.find_symbols("b").len(), 1);
    assert_eq!(context.index_state(PROJECT), Some(IndexState::Consistent));

    // Nothing was recorded for a.c, so the next pass tries it again
    let retry = manager.run_now(index_project(false)).unwrap();
    assert_eq!(retry.required, 1);
    assert_eq!(retry.failures, 1);
}

#[test]
fn test_edit_during_extraction_is_picked_up_next_pass() {
    let ws = Workspace::new();
    let a = ws.write("a.c", "int old_name;");

    let ctags = FakeCtags::new();
    ctags.set_tags(&a, vec![tag("old_name", &a, 1, "variable", &[])]);
    let edited = Arc::new(AtomicBool::new(false));
    {
        let edited = Arc::clone(&edited);
        let a = a.clone();
        ctags.on_extract(move |_| {
            if !edited.swap(true, Ordering::SeqCst) {
                fs::write(&a, "int new_name;").unwrap();
                let file = fs::File::options().write(true).open(&a).unwrap();
                file.set_modified(SystemTime::now() + Duration::from_secs(60))
                    .unwrap();
            }
        });
    }

    let manager = IndexManager::new(ws.context(ctags.clone(), ExtractionMode::Streaming));
    manager.run_now(index_project(false)).unwrap();
    assert!(edited.load(Ordering::SeqCst));
    assert_eq!(manager.context().index.find_symbols("old_name").len(), 1);

    // ctags now sees the saved text
    ctags.set_tags(&a, vec![tag("new_name", &a, 1, "variable", &[])]);
    let second = manager.run_now(index_project(false)).unwrap();

    assert_eq!(second.files_indexed, 1);
    let index = &manager.context().index;
    assert!(index.find_symbols("old_name").is_empty());
    assert_eq!(index.find_symbols("new_name").len(), 1);
}
