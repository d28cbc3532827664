use crate::error::Error;
use crate::importer::CellResult;
use log::warn;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// A card of the game's master data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCard {
    pub id: u32,
    #[serde(rename = "assetbundleName")]
    pub asset_bundle_name: String,
}

/// Maps reference icon identifiers to card ids.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    cards: Vec<CatalogCard>,
}

impl CardCatalog {
    pub fn new(cards: Vec<CatalogCard>) -> CardCatalog {
        CardCatalog { cards }
    }

    /// Parse the card master data, a JSON array of objects with at least `id` and `assetbundleName`.
    pub fn from_json_str(json: &str) -> Result<CardCatalog, Error> {
        Ok(CardCatalog::new(serde_json::from_str(json)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<CardCatalog, Error> {
        Ok(CardCatalog::new(serde_json::from_reader(reader)?))
    }

    /// The first card whose asset bundle name is part of `reference_id`.
    ///
    /// Reference identifiers are icon file names derived from the asset bundle name.
    pub fn card_id(&self, reference_id: &str) -> Option<u32> {
        self.cards
            .iter()
            .find(|card| {
                !card.asset_bundle_name.is_empty() && reference_id.contains(&card.asset_bundle_name)
            })
            .map(|card| card.id)
    }
}

/// One owned card as it is submitted to the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEntry {
    pub card_id: u32,
    pub level: u32,
    pub master_rank: u32,
}

/// Reduce the results to the owned card list, sorted by card id.
///
/// Each result contributes its selected candidate. Results without a match or with an identifier that is
/// not in the catalog are skipped.
pub fn card_list(results: &[CellResult], catalog: &CardCatalog) -> Vec<CardEntry> {
    let mut cards: Vec<CardEntry> = results
        .iter()
        .filter(|res| !res.selected_candidate().is_no_match())
        .filter_map(|res| {
            let reference_id = &res.selected_candidate().reference_id;
            match catalog.card_id(reference_id) {
                Some(card_id) => Some(CardEntry {
                    card_id,
                    level: res.level,
                    master_rank: res.master_rank,
                }),
                None => {
                    warn!("cell {}: no card for {}", res.index, reference_id);
                    None
                }
            }
        })
        .collect();
    cards.sort_by_key(|card| card.card_id);
    cards
}
