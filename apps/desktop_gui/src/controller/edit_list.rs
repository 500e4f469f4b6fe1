//! Inline-edit state machine for the task list.
//!
//! Owns the transient "which row is being edited" state and the unsaved
//! draft text. It never touches the task collection itself: callers hand in
//! the current rows and a one-shot apply callback, and the controller
//! decides whether that callback fires. All editing is gated by a single
//! externally owned flag; with the gate closed every operation is a silent
//! no-op. Pure state with no I/O of its own, so it is testable without a
//! rendering context.

use shared::domain::TaskId;

/// Minimal view of a task as the edit controller sees it. Rows that have
/// not yet been assigned an id by the backend cannot hold an edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub task_id: Option<TaskId>,
    pub title: String,
}

/// Key classification for [`InlineEditController::handle_key`]; only the
/// confirm key commits, everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Confirm,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A precondition failed (gate closed, id missing, or non-confirm key);
    /// session state untouched.
    Rejected,
    /// Target row found; apply callback invoked once, session cleared.
    Applied,
    /// Target row no longer in the collection; callback skipped, session
    /// cleared anyway.
    TargetMissing,
}

#[derive(Debug, Default)]
pub struct InlineEditController {
    editing_id: Option<TaskId>,
    draft: String,
}

impl InlineEditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing_id(&self) -> Option<TaskId> {
        self.editing_id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Mutable handle to the draft for direct text-input binding. The
    /// widget only renders while a session is active, which keeps draft
    /// writes scoped to an active session.
    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn is_editing(&self, task_id: Option<TaskId>) -> bool {
        self.editing_id.is_some() && self.editing_id == task_id
    }

    /// Starts an edit session for `row`, seeding the draft with its current
    /// title. Re-entrant: starting a new edit while one is active retargets
    /// the session and drops the previous draft without saving it.
    pub fn begin_edit(&mut self, edit_enabled: bool, row: &TaskRow) {
        if !edit_enabled {
            return;
        }
        self.editing_id = row.task_id;
        self.draft = row.title.clone();
    }

    /// Replaces the draft text. Accepts anything, including empty; drafts
    /// are only validated by whoever consumes the committed row.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        if self.editing_id.is_none() {
            return;
        }
        self.draft = text.into();
    }

    /// Commits the draft against `task_id`. With the gate open and a
    /// defined id, looks the row up in `rows`: if present, `apply` is
    /// invoked exactly once with a copy carrying the draft title; if the
    /// row vanished the callback is skipped. Either way the session is
    /// cleared as the final step. If the gate is closed or the id is
    /// undefined nothing happens at all.
    pub fn commit<F>(
        &mut self,
        edit_enabled: bool,
        task_id: Option<TaskId>,
        rows: &[TaskRow],
        apply: F,
    ) -> CommitOutcome
    where
        F: FnOnce(TaskRow),
    {
        let Some(task_id) = task_id else {
            return CommitOutcome::Rejected;
        };
        if !edit_enabled {
            return CommitOutcome::Rejected;
        }

        let target = rows.iter().find(|row| row.task_id == Some(task_id));
        let outcome = match target {
            Some(row) => {
                apply(TaskRow {
                    task_id: row.task_id,
                    title: self.draft.clone(),
                });
                CommitOutcome::Applied
            }
            None => CommitOutcome::TargetMissing,
        };
        self.editing_id = None;
        outcome
    }

    /// Maps the confirm key to [`Self::commit`]; all other keys are
    /// ignored.
    pub fn handle_key<F>(
        &mut self,
        edit_enabled: bool,
        key: EditKey,
        task_id: Option<TaskId>,
        rows: &[TaskRow],
        apply: F,
    ) -> CommitOutcome
    where
        F: FnOnce(TaskRow),
    {
        if key != EditKey::Confirm {
            return CommitOutcome::Rejected;
        }
        self.commit(edit_enabled, task_id, rows, apply)
    }

    /// Commit triggered by the editing input losing focus.
    pub fn handle_focus_lost<F>(
        &mut self,
        edit_enabled: bool,
        task_id: Option<TaskId>,
        rows: &[TaskRow],
        apply: F,
    ) -> CommitOutcome
    where
        F: FnOnce(TaskRow),
    {
        self.commit(edit_enabled, task_id, rows, apply)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn rows() -> Vec<TaskRow> {
        vec![
            TaskRow {
                task_id: Some(TaskId(1)),
                title: "Buy milk".to_string(),
            },
            TaskRow {
                task_id: Some(TaskId(2)),
                title: "Walk dog".to_string(),
            },
        ]
    }

    #[test]
    fn at_most_one_row_is_ever_in_editing_state() {
        let rows = rows();
        let mut edit = InlineEditController::new();

        edit.begin_edit(true, &rows[0]);
        assert!(edit.is_editing(Some(TaskId(1))));
        assert!(!edit.is_editing(Some(TaskId(2))));

        edit.begin_edit(true, &rows[1]);
        assert!(!edit.is_editing(Some(TaskId(1))));
        assert!(edit.is_editing(Some(TaskId(2))));
    }

    #[test]
    fn begin_edit_seeds_the_draft_from_the_current_title() {
        let rows = rows();
        let mut edit = InlineEditController::new();

        edit.begin_edit(true, &rows[0]);
        assert_eq!(edit.editing_id(), Some(TaskId(1)));
        assert_eq!(edit.draft(), "Buy milk");
    }

    #[test]
    fn commit_without_draft_change_applies_the_unchanged_title() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let applied = RefCell::new(Vec::new());

        edit.begin_edit(true, &rows[0]);
        let outcome = edit.commit(true, Some(TaskId(1)), &rows, |row| {
            applied.borrow_mut().push(row);
        });

        assert_eq!(outcome, CommitOutcome::Applied);
        let applied = applied.into_inner();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].title, "Buy milk");
    }

    #[test]
    fn update_then_commit_applies_the_draft_exactly_once() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let applied = RefCell::new(Vec::new());

        edit.begin_edit(true, &rows[0]);
        edit.update_draft("Buy oat milk");
        let outcome = edit.commit(true, Some(TaskId(1)), &rows, |row| {
            applied.borrow_mut().push(row);
        });

        assert_eq!(outcome, CommitOutcome::Applied);
        let applied = applied.into_inner();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].task_id, Some(TaskId(1)));
        assert_eq!(applied[0].title, "Buy oat milk");
        assert_eq!(edit.editing_id(), None);
    }

    #[test]
    fn empty_drafts_are_accepted() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let applied = RefCell::new(Vec::new());

        edit.begin_edit(true, &rows[0]);
        edit.update_draft("");
        edit.commit(true, Some(TaskId(1)), &rows, |row| {
            applied.borrow_mut().push(row);
        });

        assert_eq!(applied.into_inner()[0].title, "");
    }

    #[test]
    fn commit_clears_the_session_even_when_the_target_vanished() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let mut callback_ran = false;

        edit.begin_edit(true, &rows[0]);
        let outcome = edit.commit(true, Some(TaskId(99)), &rows, |_| {
            callback_ran = true;
        });

        assert_eq!(outcome, CommitOutcome::TargetMissing);
        assert!(!callback_ran);
        assert_eq!(edit.editing_id(), None);
    }

    #[test]
    fn closed_gate_makes_every_operation_a_no_op() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let mut callback_ran = false;

        edit.begin_edit(false, &rows[0]);
        assert_eq!(edit.editing_id(), None);

        let commit = edit.commit(false, Some(TaskId(1)), &rows, |_| callback_ran = true);
        assert_eq!(commit, CommitOutcome::Rejected);

        let key = edit.handle_key(false, EditKey::Confirm, Some(TaskId(1)), &rows, |_| {
            callback_ran = true;
        });
        assert_eq!(key, CommitOutcome::Rejected);

        let blur = edit.handle_focus_lost(false, Some(TaskId(1)), &rows, |_| {
            callback_ran = true;
        });
        assert_eq!(blur, CommitOutcome::Rejected);

        assert!(!callback_ran);
        assert_eq!(edit.editing_id(), None);
    }

    #[test]
    fn closed_gate_commit_leaves_an_active_session_untouched() {
        let rows = rows();
        let mut edit = InlineEditController::new();

        edit.begin_edit(true, &rows[0]);
        edit.update_draft("Buy oat milk");
        let outcome = edit.commit(false, Some(TaskId(1)), &rows, |_| {});

        assert_eq!(outcome, CommitOutcome::Rejected);
        assert_eq!(edit.editing_id(), Some(TaskId(1)));
        assert_eq!(edit.draft(), "Buy oat milk");
    }

    #[test]
    fn commit_with_undefined_id_is_a_pure_no_op() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let mut callback_ran = false;

        edit.begin_edit(true, &rows[0]);
        let outcome = edit.commit(true, None, &rows, |_| callback_ran = true);

        assert_eq!(outcome, CommitOutcome::Rejected);
        assert!(!callback_ran);
        assert_eq!(edit.editing_id(), Some(TaskId(1)));
    }

    #[test]
    fn retargeting_discards_the_prior_draft_without_saving() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let mut callback_ran = false;

        edit.begin_edit(true, &rows[0]);
        edit.update_draft("half-typed change");
        edit.begin_edit(true, &rows[1]);

        assert_eq!(edit.editing_id(), Some(TaskId(2)));
        assert_eq!(edit.draft(), "Walk dog");

        // Only the retargeted row can commit; row 1 never sees a callback.
        edit.commit(true, Some(TaskId(2)), &rows, |row| {
            callback_ran = true;
            assert_eq!(row.task_id, Some(TaskId(2)));
        });
        assert!(callback_ran);
    }

    #[test]
    fn non_confirm_keys_are_ignored() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let mut callback_ran = false;

        edit.begin_edit(true, &rows[0]);
        edit.update_draft("Buy oat milk");
        let outcome = edit.handle_key(true, EditKey::Other, Some(TaskId(1)), &rows, |_| {
            callback_ran = true;
        });

        assert_eq!(outcome, CommitOutcome::Rejected);
        assert!(!callback_ran);
        assert_eq!(edit.editing_id(), Some(TaskId(1)));
        assert_eq!(edit.draft(), "Buy oat milk");
    }

    #[test]
    fn focus_loss_commits_like_the_confirm_key() {
        let rows = rows();
        let mut edit = InlineEditController::new();
        let applied = RefCell::new(Vec::new());

        edit.begin_edit(true, &rows[1]);
        edit.update_draft("Walk dog twice");
        let outcome = edit.handle_focus_lost(true, Some(TaskId(2)), &rows, |row| {
            applied.borrow_mut().push(row);
        });

        assert_eq!(outcome, CommitOutcome::Applied);
        assert_eq!(applied.into_inner()[0].title, "Walk dog twice");
        assert_eq!(edit.editing_id(), None);
    }

    #[test]
    fn draft_updates_without_a_session_are_ignored() {
        let mut edit = InlineEditController::new();
        edit.update_draft("stray keystrokes");
        assert_eq!(edit.draft(), "");
    }

    #[test]
    fn rows_without_ids_cannot_hold_a_session() {
        let unsynced = TaskRow {
            task_id: None,
            title: "not yet saved".to_string(),
        };
        let mut edit = InlineEditController::new();

        edit.begin_edit(true, &unsynced);
        assert_eq!(edit.editing_id(), None);
        assert!(!edit.is_editing(None));
    }

    #[test]
    fn scenario_rename_with_open_gate() {
        let rows = vec![TaskRow {
            task_id: Some(TaskId(1)),
            title: "Buy milk".to_string(),
        }];
        let mut edit = InlineEditController::new();
        let applied = RefCell::new(Vec::new());

        edit.begin_edit(true, &rows[0]);
        assert_eq!(edit.editing_id(), Some(TaskId(1)));
        assert_eq!(edit.draft(), "Buy milk");

        edit.update_draft("Buy oat milk");
        assert_eq!(edit.draft(), "Buy oat milk");

        let outcome = edit.commit(true, Some(TaskId(1)), &rows, |row| {
            applied.borrow_mut().push(row);
        });
        assert_eq!(outcome, CommitOutcome::Applied);
        assert_eq!(edit.editing_id(), None);

        let applied = applied.into_inner();
        assert_eq!(
            applied,
            vec![TaskRow {
                task_id: Some(TaskId(1)),
                title: "Buy oat milk".to_string(),
            }]
        );
    }

    #[test]
    fn scenario_closed_gate_never_reaches_the_callback() {
        let rows = vec![TaskRow {
            task_id: Some(TaskId(1)),
            title: "Buy milk".to_string(),
        }];
        let mut edit = InlineEditController::new();
        let mut callback_ran = false;

        edit.begin_edit(false, &rows[0]);
        assert_eq!(edit.editing_id(), None);

        edit.commit(false, Some(TaskId(1)), &rows, |_| callback_ran = true);
        edit.handle_key(false, EditKey::Confirm, Some(TaskId(1)), &rows, |_| {
            callback_ran = true;
        });
        edit.handle_focus_lost(false, Some(TaskId(1)), &rows, |_| callback_ran = true);

        assert!(!callback_ran);
        assert_eq!(edit.editing_id(), None);
    }
}
