use std::collections::HashMap;

use uuid::Uuid;

use crate::data::listing::ListingWithFaculty;
use crate::data::swipe::StudentMatchView;

/// Local deck of swipe cards with optimistic bookkeeping.
///
/// Cards leave the deck the moment the user swipes; if the server later
/// reports the listing was already swiped on, the recorded direction is
/// reconciled to the server's instead of restoring the card.
#[derive(Debug, Default)]
pub struct SwipeDeck {
    cards: Vec<ListingWithFaculty>,
    swiped: HashMap<Uuid, bool>,
    matches: Vec<StudentMatchView>,
}

impl SwipeDeck {
    /// Replaces the deck, dropping cards already swiped on locally.
    pub fn load(&mut self, cards: Vec<ListingWithFaculty>) {
        self.cards = cards
            .into_iter()
            .filter(|card| !self.swiped.contains_key(&card.listing.id))
            .collect();
    }

    pub fn top(&self) -> Option<&ListingWithFaculty> {
        self.cards.first()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Removes the top card and records the decision locally. Returns the
    /// listing id to submit to the server.
    pub fn swipe_top(&mut self, interested: bool) -> Option<Uuid> {
        if self.cards.is_empty() {
            return None;
        }
        let card = self.cards.remove(0);
        let id = card.listing.id;
        self.swiped.insert(id, interested);
        Some(id)
    }

    pub fn recorded_interest(&self, listing_id: Uuid) -> Option<bool> {
        self.swiped.get(&listing_id).copied()
    }

    /// Adopts the server's stored direction for a listing it already had
    /// a swipe for. The card stays gone.
    pub fn reconcile_already_swiped(&mut self, listing_id: Uuid, interested: Option<bool>) {
        self.cards.retain(|card| card.listing.id != listing_id);
        if let Some(interested) = interested {
            self.swiped.insert(listing_id, interested);
        }
    }

    pub fn record_matches(&mut self, matches: Vec<StudentMatchView>) {
        self.matches = matches;
    }

    pub fn matches(&self) -> &[StudentMatchView] {
        &self.matches
    }
}
