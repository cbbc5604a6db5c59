//! The only code that changes where a user's item is.
//!
//! Three kinds of mover exist. A domain moves items through `/transfer` and is
//! held to the ownership rules below. The user can only put down what they
//! carry. The hub itself hands out journey prizes.

use tbaproto::ids::DomainId;
use tbaproto::location::Location;

use crate::catalog::ItemTemplate;
use crate::error::{HubError, conflict, forbidden};
use crate::registry::UserRec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    Domain(DomainId),
    Holder,
    Hub,
}

pub fn transfer(
    user: &mut UserRec,
    item: &ItemTemplate,
    mover: Mover,
    to: Location,
) -> Result<(), HubError> {
    let old = user.inventory.get(&item.id);

    if old == Some(&to) {
        return Err(conflict("Cannot move item to where it already is"));
    }

    match mover {
        Mover::Domain(did) => {
            match old {
                None if !item.owned_by(did) => {
                    return Err(forbidden("Cannot generate items that don't belong to you"));
                }
                Some(_) if !to.is_carried() && !item.is_home(did) => {
                    return Err(forbidden(
                        "Cannot move or remove items that don't belong to you",
                    ));
                }
                Some(Location::Dropped { domain, .. }) if *domain != did => {
                    return Err(forbidden("That item has been dropped in a different domain"));
                }
                _ => {}
            }
            if to.domain().is_some_and(|d| d != did) {
                return Err(forbidden("Cannot place items in another domain"));
            }
        }
        Mover::Holder => {
            if old != Some(&Location::Carried) {
                return Err(conflict("You are not carrying that"));
            }
            if to.is_carried() {
                return Err(conflict("Cannot move item to where it already is"));
            }
        }
        Mover::Hub => {}
    }

    if to.is_carried() {
        user.hashad.insert(item.id);
    }
    user.inventory.insert(item.id, to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use serde_json::json;
    use tbaproto::ids::{ItemId, UserId};
    use tbaproto::location::Spot;

    use super::*;
    use crate::catalog::Home;

    const HOME: DomainId = DomainId(10);
    const HOST: DomainId = DomainId(20);
    const STRANGER: DomainId = DomainId(30);

    fn item() -> ItemTemplate {
        ItemTemplate {
            id: ItemId(7),
            name: "key".into(),
            description: "a key".into(),
            verb: BTreeMap::new(),
            home: Home::Domain(HOME),
            hosts: BTreeSet::from([HOST]),
            depth: None,
        }
    }

    fn user() -> UserRec {
        UserRec::new(UserId(1), "s".into(), HOME)
    }

    fn spot(domain: DomainId, s: &str) -> Location {
        Location::Dropped {
            domain,
            spot: Spot(json!(s)),
        }
    }

    #[test]
    fn owners_originate_and_repeat_moves_conflict() {
        let mut u = user();
        transfer(&mut u, &item(), Mover::Domain(HOME), Location::Carried).unwrap();
        assert!(u.carries(ItemId(7)));
        assert!(u.hashad.contains(&ItemId(7)));

        let err = transfer(&mut u, &item(), Mover::Domain(HOME), Location::Carried).unwrap_err();
        assert!(matches!(err, HubError::Conflict(_)));
    }

    #[test]
    fn hosts_originate_but_cannot_park() {
        let mut u = user();
        transfer(&mut u, &item(), Mover::Domain(HOST), Location::Carried).unwrap();
        let err = transfer(&mut u, &item(), Mover::Domain(HOST), spot(HOST, "x")).unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));
        assert!(u.carries(ItemId(7)));
    }

    #[test]
    fn strangers_cannot_conjure() {
        let mut u = user();
        let err = transfer(&mut u, &item(), Mover::Domain(STRANGER), Location::Carried).unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));
        assert!(u.inventory.is_empty());
    }

    #[test]
    fn parking_keeps_hashad_and_drops_out_of_carried() {
        let mut u = user();
        transfer(&mut u, &item(), Mover::Domain(HOME), spot(HOME, "shelf")).unwrap();
        assert!(!u.hashad.contains(&ItemId(7)));
        transfer(&mut u, &item(), Mover::Domain(HOME), Location::Carried).unwrap();
        transfer(&mut u, &item(), Mover::Domain(HOME), spot(HOME, "floor")).unwrap();
        assert!(!u.carries(ItemId(7)));
        assert!(u.hashad.contains(&ItemId(7)));
    }

    #[test]
    fn items_parked_elsewhere_are_untouchable() {
        // Every domain, every destination: nobody but the parking domain may
        // touch an item sitting in that domain's space.
        let parked_in = HOST;
        for actor in [HOME, STRANGER] {
            for to in [Location::Carried, spot(actor, "here"), spot(parked_in, "there")] {
                let mut u = user();
                u.inventory.insert(ItemId(7), spot(parked_in, "bench"));
                let res = transfer(&mut u, &item(), Mover::Domain(actor), to);
                assert!(res.is_err(), "actor {actor} moved a foreign-parked item");
                assert_eq!(u.inventory[&ItemId(7)], spot(parked_in, "bench"));
            }
        }
    }

    #[test]
    fn domains_cannot_name_foreign_spots() {
        let mut u = user();
        let err = transfer(&mut u, &item(), Mover::Domain(HOME), spot(HOST, "x")).unwrap_err();
        assert!(matches!(err, HubError::Forbidden(_)));
    }

    #[test]
    fn holders_only_put_down_what_they_carry() {
        let mut u = user();
        let err = transfer(&mut u, &item(), Mover::Holder, spot(HOME, "floor")).unwrap_err();
        assert!(matches!(err, HubError::Conflict(_)));

        transfer(&mut u, &item(), Mover::Hub, Location::Carried).unwrap();
        transfer(&mut u, &item(), Mover::Holder, spot(STRANGER, "floor")).unwrap();
        assert_eq!(u.inventory[&ItemId(7)], spot(STRANGER, "floor"));

        let err = transfer(&mut u, &item(), Mover::Holder, spot(STRANGER, "bed")).unwrap_err();
        assert!(matches!(err, HubError::Conflict(_)));
    }

    #[test]
    fn every_noop_move_is_rejected() {
        for mover in [Mover::Domain(HOME), Mover::Holder, Mover::Hub] {
            for here in [Location::Carried, spot(HOME, "shelf")] {
                let mut u = user();
                u.inventory.insert(ItemId(7), here.clone());
                let err = transfer(&mut u, &item(), mover, here.clone()).unwrap_err();
                assert!(matches!(err, HubError::Conflict(_)), "{mover:?} {here:?}");
            }
        }
    }
}
