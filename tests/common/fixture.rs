//! A small seeded notebook
//!
//! ```text
//! Home (t3)
//!   Ideas (n5)
//! Work (t1)
//!   Meetings (t2)
//!     Agenda (n3)
//!   Ideas (n5)
//!   Report (n1)
//!     Figures (n2)
//! All Notes
//!   Agenda, Groceries (n4), Ideas, Report > Figures
//! Untagged Notes
//!   Groceries
//! ```

use notetree::{MemoryApi, NoteId, TagId, Workspace};
use std::sync::Arc;

pub struct Notebook {
    pub api: Arc<MemoryApi>,
    pub ws: Workspace,
    pub work: TagId,
    pub meetings: TagId,
    pub home: TagId,
    pub report: NoteId,
    pub figures: NoteId,
    pub agenda: NoteId,
    pub groceries: NoteId,
    pub ideas: NoteId,
}

pub fn notebook() -> Notebook {
    let api = Arc::new(MemoryApi::new());
    let work = api.seed_tag("Work", None);
    let meetings = api.seed_tag("Meetings", Some(work));
    let home = api.seed_tag("Home", None);
    let report = api.seed_note("Report", None, &[work]);
    let figures = api.seed_note("Figures", Some(report), &[]);
    let agenda = api.seed_note("Agenda", None, &[meetings]);
    let groceries = api.seed_note("Groceries", None, &[]);
    let ideas = api.seed_note("Ideas", None, &[work, home]);

    let mut ws = Workspace::open(api.clone()).expect("open workspace");
    ws.tree_mut().drain_events();
    api.clear_calls();

    Notebook {
        api,
        ws,
        work,
        meetings,
        home,
        report,
        figures,
        agenda,
        groceries,
        ideas,
    }
}
