use outliner_core::{EntityKind, NoteDraft, NoteId, OutlineDraft, Repository, SortField};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[test]
fn readers_never_observe_partial_reorder() {
    let repo = Repository::in_memory();
    let doc = repo.create_outline(OutlineDraft::new("Doc")).unwrap();
    let notes: Vec<NoteId> = (0..24)
        .map(|i| repo.create_note(NoteDraft::new(doc, format!("n{i}"))).unwrap())
        .collect();
    let expected: HashSet<NoteId> = notes.iter().copied().collect();
    let done = AtomicBool::new(false);
    let (expected, done) = (&expected, &done);

    thread::scope(|scope| {
        let writer = {
            let repo = repo.clone();
            let mut order = notes.clone();
            scope.spawn(move || {
                for round in 0..300 {
                    order.rotate_left(round % 7 + 1);
                    repo.reorder(doc, &order).unwrap();
                    if round % 50 == 0 {
                        repo.move_note_to_first(order[order.len() - 1]).unwrap();
                        order = repo.children_of(doc).unwrap();
                    }
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let repo = repo.clone();
            readers.push(scope.spawn(move || {
                let mut observations = 0;
                while !done.load(Ordering::SeqCst) || observations == 0 {
                    let children = repo.children_of(doc).unwrap();
                    let unique: HashSet<NoteId> = children.iter().copied().collect();
                    assert_eq!(children.len(), expected.len());
                    assert_eq!(&unique, expected);

                    let projection = repo.project_notes_in(doc, SortField::Title, true).unwrap();
                    assert_eq!(projection.len(), expected.len());
                    let outlines = repo.project(EntityKind::Outline, SortField::Modified, false);
                    assert_eq!(
                        outlines.outline_rows().unwrap()[0].notes_count,
                        expected.len()
                    );
                    observations += 1;
                }
                observations
            }));
        }

        writer.join().unwrap();
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
    });

    assert!(repo.check_integrity().is_empty());
}
