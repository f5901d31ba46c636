//! Plain-text rendering of the task list.
//!
//! # Invariants
//! - Output is derived only from `filtered_view()` and `remaining_count()`.
//! - Ids are shortened for display; commands accept any unique prefix.

use std::io::{self, Write};
use tasklist_core::{KvRepository, Priority, Task, TaskStore, Theme};

pub const SHORT_ID_LEN: usize = 8;

/// Writes the filtered list followed by the footer line.
pub fn render_list<R: KvRepository>(
    out: &mut impl Write,
    store: &TaskStore<R>,
    theme: Theme,
) -> io::Result<()> {
    let view = store.filtered_view();
    if view.is_empty() {
        writeln!(out, "  (nothing to show)")?;
    }
    for task in view {
        render_task(out, task, store.is_selected(&task.id))?;
    }
    writeln!(
        out,
        "{} · filter: {} · theme: {}",
        items_left(store.remaining_count()),
        store.filter(),
        theme
    )
}

fn render_task(out: &mut impl Write, task: &Task, selected: bool) -> io::Result<()> {
    let mark = if task.completed { 'x' } else { ' ' };
    let cursor = if selected { '*' } else { ' ' };
    let badge = match task.priority {
        Priority::Medium => String::new(),
        other => format!("  ({other})"),
    };
    writeln!(
        out,
        "{cursor}[{mark}] {}  {}{badge}",
        short_id(&task.id),
        task.text
    )
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

pub fn items_left(count: usize) -> String {
    if count == 1 {
        "1 item left".to_string()
    } else {
        format!("{count} items left")
    }
}

#[cfg(test)]
mod tests {
    use super::{items_left, render_list, short_id};
    use tasklist_core::{
        Filter, KvRepository, MemoryKvRepository, StoreConfig, TaskStore, Theme,
    };

    #[test]
    fn short_id_keeps_short_ids_intact() {
        assert_eq!(short_id("1"), "1");
        assert_eq!(short_id("0123456789abcdef"), "01234567");
    }

    #[test]
    fn items_left_pluralizes() {
        assert_eq!(items_left(1), "1 item left");
        assert_eq!(items_left(0), "0 items left");
    }

    #[test]
    fn render_list_shows_view_and_footer() {
        let repo = MemoryKvRepository::new();
        repo.set(
            "todos",
            r#"[{"id":"1","text":"buy milk","completed":true,"priority":"high","createdAt":1},
                {"id":"2","text":"walk dog","createdAt":2}]"#,
        )
        .unwrap();
        let mut store = TaskStore::open(&repo, StoreConfig::default());
        store.set_filter(Filter::Completed).unwrap();
        store.select("1");

        let mut out = Vec::new();
        render_list(&mut out, &store, Theme::Light).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("*[x] 1  buy milk  (high)"));
        assert!(!text.contains("walk dog"));
        assert!(text.contains("1 item left · filter: completed · theme: light"));
    }
}
