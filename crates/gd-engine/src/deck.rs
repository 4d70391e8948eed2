//! Deck pile operations — draw with reshuffle, discard, exhaust.
//!
//! Card count across the four piles is conserved by every operation
//! here; only explicit add/remove effects elsewhere change it.

use gd_types::rng::RngState;
use gd_types::state::{CardInstance, DeckState, MAX_HAND};

/// Result of a draw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawResult {
    pub drawn: u32,
    pub reshuffled: bool,
}

/// Draw up to `count` cards into the hand. When the draw pile runs out
/// and the discard pile has cards, the discard pile is reshuffled into
/// the draw pile with the battle stream. Stops early when both piles
/// are empty or the hand is full.
pub fn draw_cards(deck: &mut DeckState, rng: &mut RngState, count: u32) -> DrawResult {
    let mut drawn = 0;
    let mut reshuffled = false;
    for _ in 0..count {
        if deck.hand.len() >= MAX_HAND {
            break;
        }
        if deck.draw.is_empty() {
            if deck.discard.is_empty() {
                break;
            }
            deck.draw.append(&mut deck.discard);
            rng.shuffle(&mut deck.draw);
            reshuffled = true;
        }
        let card = deck.draw.remove(0);
        deck.hand.push(card);
        drawn += 1;
    }
    DrawResult { drawn, reshuffled }
}

/// Move the whole hand to the discard pile, in hand order.
pub fn discard_hand(deck: &mut DeckState) {
    let hand: Vec<CardInstance> = deck.hand.drain(..).collect();
    deck.discard.extend(hand);
}

/// Take the card at `hand_index` out of the hand. The caller routes it
/// to discard or exhaust.
pub fn take_from_hand(deck: &mut DeckState, hand_index: usize) -> Option<CardInstance> {
    if hand_index >= deck.hand.len() {
        return None;
    }
    Some(deck.hand.remove(hand_index))
}
