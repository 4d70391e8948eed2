//! Shop offers and purchases.
//!
//! Offers derive from the shop-offers stream: three of the four
//! templates, with costs scaling by chapter depth. Buying applies the
//! offer immediately; an offer can be bought once per shop.

use gd_types::rng::{RngState, StreamDomain};
use gd_types::state::{GameState, ShopEncounter, ShopOffer};
use gd_types::EngineError;

struct OfferTemplate {
    id: &'static str,
    label: &'static str,
    base_cost: u32,
    cost_per_tier: u32,
    heal: u32,
    attack_bonus: i32,
    mp_restore: u32,
    max_hp_bonus: u32,
}

const TEMPLATES: [OfferTemplate; 4] = [
    OfferTemplate {
        id: "patch_kit",
        label: "Patch Kit",
        base_cost: 30,
        cost_per_tier: 5,
        heal: 18,
        attack_bonus: 0,
        mp_restore: 0,
        max_hp_bonus: 0,
    },
    OfferTemplate {
        id: "compiler_blade",
        label: "Compiler Blade",
        base_cost: 55,
        cost_per_tier: 8,
        heal: 0,
        attack_bonus: 2,
        mp_restore: 0,
        max_hp_bonus: 0,
    },
    OfferTemplate {
        id: "cache_tonic",
        label: "Cache Tonic",
        base_cost: 42,
        cost_per_tier: 6,
        heal: 8,
        attack_bonus: 0,
        mp_restore: 12,
        max_hp_bonus: 0,
    },
    OfferTemplate {
        id: "max_hp_patch",
        label: "MaxHP Patch",
        base_cost: 75,
        cost_per_tier: 10,
        heal: 10,
        attack_bonus: 1,
        mp_restore: 0,
        max_hp_bonus: 10,
    },
];

/// Build the three offers for a shop node.
pub fn build_offers(seed: u32, chapter_index: u32, node_position: u32) -> Vec<ShopOffer> {
    let mut rng = RngState::stream(seed, StreamDomain::ShopOffers, &[chapter_index, node_position]);
    let mut indices: Vec<usize> = (0..TEMPLATES.len()).collect();
    rng.shuffle(&mut indices);
    indices.truncate(3);

    indices
        .into_iter()
        .map(|i| {
            let t = &TEMPLATES[i];
            ShopOffer {
                id: t.id.into(),
                label: t.label.into(),
                cost: t.base_cost + t.cost_per_tier * chapter_index,
                heal: t.heal,
                attack_bonus: t.attack_bonus,
                mp_restore: t.mp_restore,
                max_hp_bonus: t.max_hp_bonus,
            }
        })
        .collect()
}

/// Buy `offer_id` from the open shop. Deducts gold and applies the
/// offer's stat changes. Returns the cost paid.
pub fn buy(state: &mut GameState, shop: &mut ShopEncounter, offer_id: &str) -> Result<u32, EngineError> {
    if shop.purchased.iter().any(|p| p.as_ref() == offer_id) {
        return Err(EngineError::illegal("offer already purchased"));
    }
    let Some(offer) = shop.offers.iter().find(|o| o.id.as_ref() == offer_id).cloned() else {
        return Err(EngineError::illegal(format!("unknown shop offer '{offer_id}'")));
    };
    if state.player.gold < offer.cost {
        return Err(EngineError::illegal("insufficient gold"));
    }

    state.player.gold -= offer.cost;
    let character = &mut state.player.character;
    if offer.max_hp_bonus > 0 {
        character.stats.hp.base += offer.max_hp_bonus as i32;
        character.current_hp += offer.max_hp_bonus;
    }
    if offer.attack_bonus != 0 {
        character.stats.attack.base += offer.attack_bonus;
    }
    if offer.mp_restore > 0 {
        character.current_mp = (character.current_mp + offer.mp_restore).min(character.max_mp());
    }
    if offer.heal > 0 {
        character.heal(offer.heal);
    }
    shop.purchased.push(offer.id.clone());
    Ok(offer.cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offers_are_deterministic_and_three_wide() {
        let a = build_offers(42, 2, 5);
        let b = build_offers(42, 2, 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let other = build_offers(42, 2, 6);
        // A different node draws its own offer set (ids may coincide,
        // costs may not differ, but the stream must be independent).
        assert!(a != other || build_offers(43, 2, 5) != a);
    }

    #[test]
    fn costs_scale_with_chapter_tier() {
        let early = build_offers(1, 0, 3);
        let late = build_offers(1, 4, 3);
        for offer in &late {
            let base = early.iter().find(|o| o.id == offer.id);
            if let Some(base) = base {
                assert!(offer.cost > base.cost);
            }
        }
    }

    #[test]
    fn offer_ids_are_unique_within_a_shop() {
        let offers = build_offers(9, 1, 2);
        let mut ids: Vec<&str> = offers.iter().map(|o| o.id.as_ref()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), offers.len());
    }
}
