//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `outliner_core` linkage.
//! - Print a deterministic demo outlines table and its Eisenhower quadrants.
//!
//! Set `OUTLINER_LOG_DIR` to an absolute path to also write core logs.

use log::info;
use outliner_core::{
    default_log_level, init_logging, EntityKind, MatrixSort, NoteDraft, OutlineDraft, Quadrant,
    Repository, RepositoryResult, SortField,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("outliner_core ping={}", outliner_core::ping());
    println!("outliner_core version={}", outliner_core::core_version());

    if let Ok(log_dir) = std::env::var("OUTLINER_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match demo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn demo() -> RepositoryResult<()> {
    let repo = Repository::in_memory();
    let roadmap = repo.create_outline(
        OutlineDraft::new("Roadmap")
            .with_importance(5)
            .with_urgency(3)
            .with_progress(40),
    )?;
    let reading = repo.create_outline(OutlineDraft::new("Reading list").with_importance(2))?;
    for title in ["Goals", "Milestones", "Risks"] {
        repo.create_note(NoteDraft::new(roadmap, title))?;
    }
    repo.create_note(NoteDraft::new(reading, "Backlog"))?;

    let projection = repo.project(EntityKind::Outline, SortField::Importance, false);
    println!(
        "{:<16} {:>10} {:>7} {:>8} {:>5}",
        "title", "importance", "urgency", "progress", "notes"
    );
    for row in projection.outline_rows().unwrap_or_default() {
        println!(
            "{:<16} {:>10} {:>7} {:>7}% {:>5}",
            row.title, row.importance, row.urgency, row.progress, row.notes_count
        );
    }
    let matrix = repo.eisenhower_matrix(MatrixSort::Importance);
    for quadrant in Quadrant::ALL {
        println!("{:?}: {}", quadrant, matrix.quadrant(quadrant).len());
    }
    info!(
        "event=cli_demo module=cli status=ok outlines={} notes={}",
        repo.outline_count(),
        repo.note_count()
    );
    Ok(())
}
