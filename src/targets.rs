//! Turns user selections (ids or names) into the networks a report covers.

use thiserror::Error;

use crate::model::{Network, Organization};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("no organizations are visible to this API key")]
    NoOrganizations,
    #[error("several organizations are available; pick one with --org ({0})")]
    OrganizationRequired(String),
    #[error("organization `{0}` not found")]
    UnknownOrganization(String),
    #[error("wireless network `{0}` not found in this organization")]
    UnknownNetwork(String),
    #[error("select at least one network with --network, or use --all")]
    NoNetworks,
    #[error("organization has no wireless networks")]
    NoWirelessNetworks,
}

/// A network selected for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub name: String,
}

impl From<&Network> for Target {
    fn from(network: &Network) -> Self {
        Self {
            id: network.id.clone(),
            name: network.name.clone(),
        }
    }
}

/// Picks an organization by id or exact name. Without a selection the only
/// visible organization is used.
pub fn select_organization(
    organizations: &[Organization],
    wanted: Option<&str>,
) -> Result<Organization, TargetError> {
    match wanted {
        Some(wanted) => organizations
            .iter()
            .find(|o| o.id == wanted)
            .or_else(|| organizations.iter().find(|o| o.name == wanted))
            .cloned()
            .ok_or_else(|| TargetError::UnknownOrganization(wanted.to_string())),
        None => match organizations {
            [] => Err(TargetError::NoOrganizations),
            [only] => Ok(only.clone()),
            many => Err(TargetError::OrganizationRequired(
                many.iter()
                    .map(|o| o.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        },
    }
}

/// Resolves the report targets among the wireless networks of an organization.
///
/// With `all` every wireless network is taken in upstream order; otherwise the
/// caller's order is kept and repeated selections are ignored.
pub fn select_networks(
    networks: &[Network],
    wanted: &[String],
    all: bool,
) -> Result<Vec<Target>, TargetError> {
    let wireless: Vec<&Network> = networks.iter().filter(|n| n.is_wireless()).collect();

    if all {
        if wireless.is_empty() {
            return Err(TargetError::NoWirelessNetworks);
        }
        return Ok(wireless.into_iter().map(Target::from).collect());
    }

    if wanted.is_empty() {
        return Err(TargetError::NoNetworks);
    }

    let mut targets: Vec<Target> = Vec::new();
    for selection in wanted {
        let network = wireless
            .iter()
            .find(|n| n.id == *selection)
            .or_else(|| wireless.iter().find(|n| n.name == *selection))
            .ok_or_else(|| TargetError::UnknownNetwork(selection.clone()))?;
        if !targets.iter().any(|t| t.id == network.id) {
            targets.push(Target::from(*network));
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(id: &str, name: &str) -> Organization {
        Organization {
            id: id.into(),
            name: name.into(),
        }
    }

    fn net(id: &str, name: &str, products: &[&str]) -> Network {
        Network {
            id: id.into(),
            name: name.into(),
            product_types: products.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn single_organization_is_implicit() {
        let orgs = vec![org("1", "Acme")];
        assert_eq!(select_organization(&orgs, None).unwrap().id, "1");
    }

    #[test]
    fn organization_required_when_ambiguous() {
        let orgs = vec![org("1", "Acme"), org("2", "Globex")];
        let err = select_organization(&orgs, None).unwrap_err();
        assert_eq!(err, TargetError::OrganizationRequired("Acme, Globex".into()));
        assert_eq!(select_organization(&orgs, Some("Globex")).unwrap().id, "2");
        assert_eq!(select_organization(&orgs, Some("1")).unwrap().name, "Acme");
        assert!(matches!(
            select_organization(&orgs, Some("Initech")),
            Err(TargetError::UnknownOrganization(_))
        ));
    }

    #[test]
    fn all_takes_wireless_networks_in_upstream_order() {
        let nets = vec![
            net("N_2", "Branch", &["wireless", "switch"]),
            net("N_3", "Lab", &["switch"]),
            net("N_1", "HQ", &["wireless"]),
        ];
        let targets = select_networks(&nets, &[], true).unwrap();
        let ids: Vec<_> = targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["N_2", "N_1"]);
    }

    #[test]
    fn explicit_selection_keeps_caller_order_and_dedupes() {
        let nets = vec![
            net("N_1", "HQ", &["wireless"]),
            net("N_2", "Branch", &["wireless"]),
        ];
        let wanted = vec!["Branch".to_string(), "N_1".to_string(), "N_2".to_string()];
        let targets = select_networks(&nets, &wanted, false).unwrap();
        assert_eq!(
            targets,
            vec![
                Target {
                    id: "N_2".into(),
                    name: "Branch".into()
                },
                Target {
                    id: "N_1".into(),
                    name: "HQ".into()
                },
            ]
        );
    }

    #[test]
    fn non_wireless_networks_cannot_be_selected() {
        let nets = vec![net("N_3", "Lab", &["switch"])];
        assert_eq!(
            select_networks(&nets, &["Lab".to_string()], false),
            Err(TargetError::UnknownNetwork("Lab".into()))
        );
        assert_eq!(
            select_networks(&nets, &[], true),
            Err(TargetError::NoWirelessNetworks)
        );
        assert_eq!(
            select_networks(&nets, &[], false),
            Err(TargetError::NoNetworks)
        );
    }
}
