use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::iter::Sum;
use std::ops::Add;

/// status code plus the separator before the path
const MIN_LINE_LENGTH: usize = 3;

const RENAME_MARKER: &str = " -> ";
const UNTRACKED_CODE: &str = "??";

/// counts of uncommitted changes, by category
///
/// total is always derived from the five counters, so it can never disagree
/// with them. a summary is never mutated after construction; each refresh
/// builds a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    modified: usize,
    added: usize,
    deleted: usize,
    renamed: usize,
    untracked: usize,
}

impl ChangeSummary {
    pub const fn new(
        modified: usize,
        added: usize,
        deleted: usize,
        renamed: usize,
        untracked: usize,
    ) -> Self {
        Self {
            modified,
            added,
            deleted,
            renamed,
            untracked,
        }
    }

    pub const fn modified(&self) -> usize {
        self.modified
    }

    pub const fn added(&self) -> usize {
        self.added
    }

    pub const fn deleted(&self) -> usize {
        self.deleted
    }

    pub const fn renamed(&self) -> usize {
        self.renamed
    }

    pub const fn untracked(&self) -> usize {
        self.untracked
    }

    pub const fn total(&self) -> usize {
        self.modified + self.added + self.deleted + self.renamed + self.untracked
    }

    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// (abbreviation, name, count) for each category, in display order
    pub fn categories(&self) -> [(char, &'static str, usize); 5] {
        [
            ('M', "modified", self.modified()),
            ('A', "added", self.added()),
            ('D', "deleted", self.deleted()),
            ('R', "renamed", self.renamed()),
            ('U', "untracked", self.untracked()),
        ]
    }

    /// build a summary from `git status --porcelain` output
    pub fn from_porcelain(output: &str) -> Self {
        let mut summary = Self::default();
        for line in output.lines() {
            match classify(line) {
                Some(Category::Modified) => summary.modified += 1,
                Some(Category::Added) => summary.added += 1,
                Some(Category::Deleted) => summary.deleted += 1,
                Some(Category::Renamed) => summary.renamed += 1,
                Some(Category::Untracked) => summary.untracked += 1,
                None => {}
            }
        }
        summary
    }
}

impl Add for ChangeSummary {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(
            self.modified + other.modified,
            self.added + other.added,
            self.deleted + other.deleted,
            self.renamed + other.renamed,
            self.untracked + other.untracked,
        )
    }
}

impl Sum for ChangeSummary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Serialize for ChangeSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChangeSummary", 6)?;
        state.serialize_field("modified", &self.modified)?;
        state.serialize_field("added", &self.added)?;
        state.serialize_field("deleted", &self.deleted)?;
        state.serialize_field("renamed", &self.renamed)?;
        state.serialize_field("untracked", &self.untracked)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
}

/// classify a single porcelain line, None for blank, malformed or uncounted lines
fn classify(line: &str) -> Option<Category> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() || line.len() < MIN_LINE_LENGTH {
        return None;
    }

    // non-ascii status codes are not porcelain output
    let code = line.get(..2)?;
    let path = line.get(MIN_LINE_LENGTH..)?.trim();

    // renames are checked first, their status code overlaps with the others
    if path.contains(RENAME_MARKER) {
        Some(Category::Renamed)
    } else if code == UNTRACKED_CODE {
        Some(Category::Untracked)
    } else if code.contains('M') {
        Some(Category::Modified)
    } else if code.contains('A') {
        Some(Category::Added)
    } else if code.contains('D') {
        Some(Category::Deleted)
    } else {
        None
    }
}
