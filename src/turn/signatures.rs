//! Turn signatures of the monitored intersection
//!
//! Five zones surround the intersection. A signature names the zone an
//! object came from and the zone it has just entered; the `)` terminal
//! means the second zone is still open.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::Turn;

const TURN_SIGNATURES: [(&str, Turn); 12] = [
    ("[zone01-zone02)", Turn::Straight),
    ("[zone01-zone03)", Turn::Right),
    ("[zone02-zone01)", Turn::Straight),
    ("[zone02-zone03)", Turn::Left),
    ("[zone03-zone01)", Turn::Left),
    ("[zone03-zone02)", Turn::Right),
    ("[zone01-zone04)", Turn::Left),
    ("[zone04-zone01)", Turn::Right),
    ("[zone05-zone01)", Turn::Straight),
    ("[zone01-zone05)", Turn::Straight),
    ("[zone04-zone05)", Turn::Left),
    ("[zone05-zone04)", Turn::Right),
];

static TABLE: OnceLock<HashMap<&'static str, Turn>> = OnceLock::new();

/// The intersection's signature table, built on first use
pub fn default_table() -> &'static HashMap<&'static str, Turn> {
    TABLE.get_or_init(|| TURN_SIGNATURES.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_all_signatures() {
        let table = default_table();
        assert_eq!(table.len(), 12);
        assert_eq!(table.get("[zone05-zone04)"), Some(&Turn::Right));
    }

    #[test]
    fn test_every_signature_is_an_open_zone_pair() {
        for signature in default_table().keys() {
            assert!(signature.starts_with('[') && signature.ends_with(')'));
            assert_eq!(signature.matches('-').count(), 1);
        }
    }
}
