//! AniList search-list query inputs.
//!
//! Only the GraphQL variables are built here; talking to AniList is the
//! metadata layer's job. Each named list is a variant of [`SearchList`] so an
//! unknown list name is a parse error instead of a missing map entry.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Month, NaiveDate};
use serde::Serialize;

pub const SEARCH_LIST_MAX_PAGE: u32 = 4;
pub const SEARCH_LIST_PER_PAGE: u32 = 50;

pub const SEARCH_LIST_QUERY: &str = r#"query (
  $page: Int!
  $perPage: Int!
  $season: MediaSeason
  $seasonYear: Int
  $sort: [MediaSort]
) {
  Page(page: $page, perPage: $perPage) {
    media(type: ANIME, season: $season, seasonYear: $seasonYear, sort: $sort) {
      id
    }
  }
}"#;

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSeason {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl MediaSeason {
    pub fn from_month(month: Month) -> Self {
        match month {
            Month::January | Month::February | Month::March => MediaSeason::Winter,
            Month::April | Month::May | Month::June => MediaSeason::Spring,
            Month::July | Month::August | Month::September => MediaSeason::Summer,
            Month::October | Month::November | Month::December => MediaSeason::Fall,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_month(MONTHS[date.month0() as usize])
    }

    /// The following season and whether it starts a new year.
    pub fn next(self) -> (Self, bool) {
        match self {
            MediaSeason::Winter => (MediaSeason::Spring, false),
            MediaSeason::Spring => (MediaSeason::Summer, false),
            MediaSeason::Summer => (MediaSeason::Fall, false),
            MediaSeason::Fall => (MediaSeason::Winter, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSort {
    TrendingDesc,
    PopularityDesc,
    ScoreDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    Manga,
    Novel,
    OneShot,
}

impl MediaFormat {
    /// The addon content type for this format, if it is watchable.
    pub fn simple_type(self) -> Option<&'static str> {
        match self {
            MediaFormat::Tv | MediaFormat::TvShort | MediaFormat::Ova | MediaFormat::Ona => {
                Some("series")
            }
            MediaFormat::Movie | MediaFormat::Special | MediaFormat::OneShot => Some("movie"),
            MediaFormat::Music | MediaFormat::Manga | MediaFormat::Novel => None,
        }
    }
}

/// Variables for [`SEARCH_LIST_QUERY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListInput {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<MediaSeason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_year: Option<i32>,
    pub sort: Vec<MediaSort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchList {
    Trending,
    ThisSeason,
    NextSeason,
    Popular,
    Top100,
}

impl SearchList {
    pub const ALL: [SearchList; 5] = [
        SearchList::Trending,
        SearchList::ThisSeason,
        SearchList::NextSeason,
        SearchList::Popular,
        SearchList::Top100,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SearchList::Trending => "trending",
            SearchList::ThisSeason => "this-season",
            SearchList::NextSeason => "next-season",
            SearchList::Popular => "popular",
            SearchList::Top100 => "top-100",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SearchList::Trending => "Trending",
            SearchList::ThisSeason => "Popular This Season",
            SearchList::NextSeason => "Upcoming Next Season",
            SearchList::Popular => "All Time Popular",
            SearchList::Top100 => "Top 100",
        }
    }

    /// Query variables for `page`, relative to `today`.
    pub fn input(self, page: u32, today: NaiveDate) -> SearchListInput {
        let seasonal = |season, year| SearchListInput {
            page,
            per_page: SEARCH_LIST_PER_PAGE,
            season: Some(season),
            season_year: Some(year),
            sort: vec![MediaSort::PopularityDesc, MediaSort::ScoreDesc],
        };
        let sorted = |sort| SearchListInput {
            page,
            per_page: SEARCH_LIST_PER_PAGE,
            season: None,
            season_year: None,
            sort,
        };

        match self {
            SearchList::Trending => sorted(vec![MediaSort::TrendingDesc, MediaSort::PopularityDesc]),
            SearchList::ThisSeason => seasonal(MediaSeason::of(today), today.year()),
            SearchList::NextSeason => {
                let (season, new_year) = MediaSeason::of(today).next();
                let year = if new_year { today.year() + 1 } else { today.year() };
                seasonal(season, year)
            }
            SearchList::Popular => sorted(vec![MediaSort::PopularityDesc]),
            SearchList::Top100 => sorted(vec![MediaSort::ScoreDesc]),
        }
    }
}

impl SearchList {
    /// Inputs for every page of the list, first to last.
    pub fn pages(self, today: NaiveDate) -> impl Iterator<Item = SearchListInput> {
        (1..=SEARCH_LIST_MAX_PAGE).map(move |page| self.input(page, today))
    }
}

impl fmt::Display for SearchList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search list {0:?}")]
pub struct UnknownSearchList(pub String);

impl FromStr for SearchList {
    type Err = UnknownSearchList;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchList::ALL
            .into_iter()
            .find(|list| list.id() == s)
            .ok_or_else(|| UnknownSearchList(s.to_string()))
    }
}
