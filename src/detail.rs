//! Detail view: keyboard navigation state and the information cards

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dataset::Temple;

/// What Left/Right do at the first and last record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    #[default]
    Wrap,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Escape,
    Back,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailState {
    Closed,
    Open { index: usize },
}

/// Result of a key press while the view is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailCommand {
    Close,
    Show(usize),
    Ignore,
}

pub struct DetailView {
    state: DetailState,
    policy: EdgePolicy,
}

impl DetailView {
    pub fn new(policy: EdgePolicy) -> Self {
        Self { state: DetailState::Closed, policy }
    }

    #[cfg(test)]
    pub fn state(&self) -> DetailState {
        self.state
    }

    pub fn current(&self) -> Option<usize> {
        match self.state {
            DetailState::Open { index } => Some(index),
            DetailState::Closed => None,
        }
    }

    pub fn open(&mut self, index: usize) {
        self.state = DetailState::Open { index };
    }

    pub fn close(&mut self) {
        self.state = DetailState::Closed;
    }

    /// Map a key to a command over a list of `len` records
    pub fn command_for(&self, key: NavKey, len: usize) -> DetailCommand {
        let DetailState::Open { index } = self.state else {
            return DetailCommand::Ignore;
        };
        match key {
            NavKey::Escape | NavKey::Back => DetailCommand::Close,
            NavKey::Left => self.step(index, -1, len),
            NavKey::Right => self.step(index, 1, len),
            // Reserved
            NavKey::Up | NavKey::Down => DetailCommand::Ignore,
        }
    }

    fn step(&self, index: usize, dir: i64, len: usize) -> DetailCommand {
        if len == 0 {
            return DetailCommand::Ignore;
        }
        let target = index as i64 + dir;
        let next = match self.policy {
            EdgePolicy::Wrap => target.rem_euclid(len as i64) as usize,
            EdgePolicy::Clamp => target.clamp(0, len as i64 - 1) as usize,
        };
        if next == index {
            DetailCommand::Ignore
        } else {
            DetailCommand::Show(next)
        }
    }
}

/// One titled block of label/value rows
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl Card {
    fn new(title: &'static str) -> Self {
        Self { title, rows: Vec::new(), body: None }
    }

    fn row(&mut self, label: &'static str, value: impl Into<String>) {
        self.rows.push((label, value.into()));
    }

    #[cfg(test)]
    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows.iter().find(|(l, _)| *l == label).map(|(_, v)| v.as_str())
    }
}

/// "June 4, 2000"; unparsable strings pass through unchanged
pub fn format_date(date: &str) -> String {
    let day = date.get(..10).unwrap_or(date);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(d) => d.format("%B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

pub fn dedication_label(temple: &Temple) -> String {
    match temple.dedication_date.as_deref() {
        Some(d) if !d.is_empty() => format_date(d),
        _ => "To be announced".to_string(),
    }
}

/// All cards that have something to show, in display order
pub fn cards(temple: &Temple) -> Vec<Card> {
    let mut out = vec![overview_card(temple), location_card(temple)];
    out.extend(facilities_card(temple));
    out.extend(history_card(temple));
    out
}

pub fn overview_card(temple: &Temple) -> Card {
    let mut card = Card::new("Temple Overview");
    card.row("Status", temple.status.label());
    card.row("Dedicated", dedication_label(temple));

    if let Some(details) = &temple.details {
        if let Some(architect) = &details.architect {
            card.row("Architect", architect.as_str());
        }
        if let Some(area) = &details.total_floor_area {
            card.row("Floor Area", area.as_str());
        }
        if let Some(n) = details.number_of_ordinance_rooms.filter(|n| *n > 0) {
            card.row("Ordinance Rooms", n.to_string());
        }
        if let Some(n) = details.number_of_seating_rooms.filter(|n| *n > 0) {
            card.row("Sealing Rooms", n.to_string());
        }
        card.body = details.description.clone();
    }
    card
}

pub fn location_card(temple: &Temple) -> Card {
    let loc = &temple.location;
    let mut card = Card::new("Location & Address");
    card.row("City", loc.city.as_str());
    if let Some(sub) = loc.subdivision() {
        card.row("State/Region", sub);
    }
    card.row("Country", loc.country.as_str());
    card.row("Address", temple.address.as_str());
    card.row(
        "Coordinates",
        format!("{:.6}, {:.6}", loc.coordinates.lat, loc.coordinates.lng),
    );
    card
}

pub fn facilities_card(temple: &Temple) -> Option<Card> {
    let details = temple.details.as_ref()?;
    let available: Vec<&'static str> = [
        ("Visitor Center", details.visitor_center),
        ("Distribution Center", details.distribution),
        ("Patron Housing", details.patron_housing),
        ("Cafeteria", details.cafeteria),
        ("Clothing Rental", details.clothing),
    ]
    .into_iter()
    .filter(|(_, value)| *value == Some(true))
    .map(|(label, _)| label)
    .collect();

    if available.is_empty() {
        return None;
    }
    let mut card = Card::new("Available Facilities");
    for label in available {
        card.row(label, "Available");
    }
    Some(card)
}

pub fn history_card(temple: &Temple) -> Option<Card> {
    let history = temple.history.as_ref()?;
    let has_history = history.groundbreaking.is_some()
        || history.public_open_house.is_some()
        || history.rededication.is_some()
        || history.renovation.is_some();
    if !has_history {
        return None;
    }

    let mut card = Card::new("Temple History");
    if let Some(d) = &history.groundbreaking {
        card.row("Groundbreaking", format_date(d));
    }
    if let Some(d) = &temple.dedication_date {
        card.row("Dedication", format_date(d));
    }
    if let Some(range) = &history.public_open_house {
        card.row(
            "Public Open House",
            format!("{} - {}", format_date(&range.start), format_date(&range.end)),
        );
    }
    if let Some(d) = &history.rededication {
        card.row("Rededication", format_date(d));
    }
    if let Some(start) = history.renovation.as_ref().and_then(|r| r.start.as_deref()) {
        let value = match history.renovation.as_ref().and_then(|r| r.end.as_deref()) {
            Some(end) => format!("{} - {}", format_date(start), format_date(end)),
            None => format_date(start),
        };
        card.row("Renovation", value);
    }
    Some(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{sample_temple, DateRange, Details, History, OpenDateRange};

    #[test]
    fn test_closed_view_ignores_keys() {
        let view = DetailView::new(EdgePolicy::Wrap);
        assert_eq!(view.command_for(NavKey::Right, 5), DetailCommand::Ignore);
        assert_eq!(view.command_for(NavKey::Escape, 5), DetailCommand::Ignore);
    }

    #[test]
    fn test_escape_and_back_close() {
        let mut view = DetailView::new(EdgePolicy::Wrap);
        view.open(2);
        assert_eq!(view.command_for(NavKey::Escape, 5), DetailCommand::Close);
        assert_eq!(view.command_for(NavKey::Back, 5), DetailCommand::Close);
    }

    #[test]
    fn test_wrap_at_both_ends() {
        let mut view = DetailView::new(EdgePolicy::Wrap);
        view.open(0);
        assert_eq!(view.command_for(NavKey::Left, 4), DetailCommand::Show(3));
        view.open(3);
        assert_eq!(view.command_for(NavKey::Right, 4), DetailCommand::Show(0));
        view.open(1);
        assert_eq!(view.command_for(NavKey::Right, 4), DetailCommand::Show(2));
    }

    #[test]
    fn test_clamp_at_both_ends() {
        let mut view = DetailView::new(EdgePolicy::Clamp);
        view.open(0);
        assert_eq!(view.command_for(NavKey::Left, 4), DetailCommand::Ignore);
        view.open(3);
        assert_eq!(view.command_for(NavKey::Right, 4), DetailCommand::Ignore);
        assert_eq!(view.command_for(NavKey::Left, 4), DetailCommand::Show(2));
    }

    #[test]
    fn test_up_down_are_reserved() {
        let mut view = DetailView::new(EdgePolicy::Wrap);
        view.open(1);
        assert_eq!(view.command_for(NavKey::Up, 4), DetailCommand::Ignore);
        assert_eq!(view.command_for(NavKey::Down, 4), DetailCommand::Ignore);
    }

    #[test]
    fn test_single_record_wrap_is_ignored() {
        let mut view = DetailView::new(EdgePolicy::Wrap);
        view.open(0);
        assert_eq!(view.command_for(NavKey::Right, 1), DetailCommand::Ignore);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2000-06-04"), "June 4, 2000");
        assert_eq!(format_date("1893-04-06T00:00:00Z"), "April 6, 1893");
        assert_eq!(format_date("sometime"), "sometime");
    }

    #[test]
    fn test_minimal_record_has_overview_and_location_only() {
        let temple = sample_temple(1, "Minimal", 40.0, -111.0);
        let cards = cards(&temple);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].value("Dedicated"), Some("To be announced"));
        assert_eq!(cards[1].value("Coordinates"), Some("40.000000, -111.000000"));
        assert_eq!(cards[1].value("State/Region"), None);
    }

    #[test]
    fn test_facilities_lists_only_true_flags() {
        let mut temple = sample_temple(1, "T", 1.0, 1.0);
        temple.details = Some(Details {
            visitor_center: Some(false),
            cafeteria: Some(true),
            clothing: Some(true),
            ..Details::default()
        });
        let card = facilities_card(&temple).unwrap();
        let labels: Vec<_> = card.rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Cafeteria", "Clothing Rental"]);

        temple.details = Some(Details { visitor_center: Some(false), ..Details::default() });
        assert!(facilities_card(&temple).is_none());
    }

    #[test]
    fn test_history_card() {
        let mut temple = sample_temple(1, "T", 1.0, 1.0);
        temple.dedication_date = Some("2005-08-07".to_string());
        temple.history = Some(History { closure: Some("2019-01-01".to_string()), ..History::default() });
        assert!(history_card(&temple).is_none());

        temple.history = Some(History {
            public_open_house: Some(DateRange { start: "2005-07-18".to_string(), end: "2005-07-30".to_string() }),
            renovation: Some(OpenDateRange { start: Some("2017-12-01".to_string()), end: None }),
            ..History::default()
        });
        let card = history_card(&temple).unwrap();
        assert_eq!(card.value("Dedication"), Some("August 7, 2005"));
        assert_eq!(card.value("Public Open House"), Some("July 18, 2005 - July 30, 2005"));
        assert_eq!(card.value("Renovation"), Some("December 1, 2017"));
        assert_eq!(card.value("Groundbreaking"), None);
    }

    #[test]
    fn test_overview_optional_rows() {
        let mut temple = sample_temple(1, "T", 1.0, 1.0);
        temple.details = Some(Details {
            architect: Some("A. Builder".to_string()),
            number_of_ordinance_rooms: Some(0),
            number_of_seating_rooms: Some(3),
            description: Some("Granite.".to_string()),
            ..Details::default()
        });
        let card = overview_card(&temple);
        assert_eq!(card.value("Architect"), Some("A. Builder"));
        assert_eq!(card.value("Ordinance Rooms"), None);
        assert_eq!(card.value("Sealing Rooms"), Some("3"));
        assert_eq!(card.body.as_deref(), Some("Granite."));
    }
}
