//! Pure derived-view pipeline: filter, sort, truncate.
//!
//! Everything in this module is a deterministic function of the roster and
//! the view parameters. No I/O, no clock, no shared state.

use serde::{Serialize, Serializer};
use std::num::NonZeroUsize;

use crate::models::Player;

/// Page size the view starts with before any intent arrives.
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Column the visible slice is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  #[default]
  Id,
  Name,
  Ping,
}

impl SortKey {
  /// Lenient parse: unknown keys fall back to the id ordering.
  pub fn parse_or_default(raw: &str) -> Self {
    match raw.to_ascii_lowercase().as_str() {
      "name" => Self::Name,
      "ping" => Self::Ping,
      _ => Self::Id,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending,
}

impl SortDirection {
  /// Lenient parse: anything that is not descending sorts ascending.
  pub fn parse_or_default(raw: &str) -> Self {
    match raw.to_ascii_lowercase().as_str() {
      "desc" | "descending" => Self::Descending,
      _ => Self::Ascending,
    }
  }
}

/// Row count the visible slice is truncated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
  Limited(NonZeroUsize),
  /// No truncation (the "All" option in the page-size dropdown).
  All,
}

impl PageSize {
  /// A limited page size; zero means unbounded.
  pub fn limited(n: usize) -> Self {
    match NonZeroUsize::new(n) {
      Some(n) => Self::Limited(n),
      None => Self::All,
    }
  }
}

impl Default for PageSize {
  fn default() -> Self {
    Self::limited(DEFAULT_PAGE_SIZE)
  }
}

// Serialized as the dropdown wire values: a number, or the string "all".
impl Serialize for PageSize {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Limited(n) => serializer.serialize_u64(n.get() as u64),
      Self::All => serializer.serialize_str("all"),
    }
  }
}

/// The adjustable parameters of the derived view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
  pub search_term: String,
  pub page_size: PageSize,
  pub sort_key: SortKey,
  pub sort_direction: SortDirection,
}

/// Filter, sort and truncate the roster into the visible slice.
///
/// The filter keeps players whose lowercased name contains the lowercased
/// search term, or whose decimal id contains the term verbatim; an empty
/// term keeps everyone. The sort is stable, so players with equal keys stay
/// in roster order. The slice is the first `page_size` rows of the result.
pub fn apply_view(roster: &[Player], view: &ViewState) -> Vec<Player> {
  let mut slice: Vec<&Player> = filtered(roster, &view.search_term).collect();
  sort_players(&mut slice, view.sort_key, view.sort_direction);
  let keep = match view.page_size {
    PageSize::Limited(n) => n.get().min(slice.len()),
    PageSize::All => slice.len(),
  };
  slice.into_iter().take(keep).cloned().collect()
}

/// Players matching the search term, before pagination.
pub fn match_count(roster: &[Player], term: &str) -> usize {
  filtered(roster, term).count()
}

fn filtered<'a>(roster: &'a [Player], term: &'a str) -> impl Iterator<Item = &'a Player> {
  let needle = term.to_lowercase();
  roster.iter().filter(move |player| {
    needle.is_empty()
      || player.name.to_lowercase().contains(&needle)
      || player.id.to_string().contains(term)
  })
}

fn sort_players(players: &mut [&Player], key: SortKey, direction: SortDirection) {
  players.sort_by(|a, b| {
    let ordering = match key {
      SortKey::Id => a.id.cmp(&b.id),
      SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
      SortKey::Ping => a.ping.cmp(&b.ping),
    };
    match direction {
      SortDirection::Ascending => ordering,
      SortDirection::Descending => ordering.reverse(),
    }
  });
}
