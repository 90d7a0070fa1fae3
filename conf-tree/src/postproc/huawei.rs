//! Huawei VRP diff rewrites.

use indexmap::IndexMap;
use log::trace;

use crate::tree::{ConfTree, NodeId};
use crate::vendor::Vendor;

/// Whole interfaces are removed with `clear configuration interface`, and
/// changing the port link-type drops the VLAN settings of the old type.
pub fn interface(tree: &mut ConfTree) {
    if tree.vendor() != Vendor::Huawei {
        return;
    }
    let root = tree.root();
    for id in tree.child_ids(root) {
        let line = tree.line(id).to_string();
        if let Some(name) = line.strip_prefix("undo interface ") {
            let cleared = format!("clear configuration interface {name}");
            trace!("{line:?} -> {cleared:?}");
            tree.rename_child(root, &line, &cleared);
        } else if line.starts_with("interface ") {
            port_link_type(tree, id);
        }
    }
}

fn port_link_type(tree: &mut ConfTree, section: NodeId) {
    let lines: Vec<String> = tree
        .children(section)
        .map(|id| tree.line(id).to_string())
        .collect();
    for line in lines {
        if tree.child(section, &line).is_none() {
            continue;
        }
        let Some(kind) = line.strip_prefix("undo port link-type ") else {
            continue;
        };
        if kind.contains(' ') {
            continue;
        }
        let stale = format!("undo port {kind} ");
        let siblings: Vec<String> = tree
            .children(section)
            .map(|child| tree.line(child))
            .filter(|sibling| sibling.starts_with(&stale))
            .map(str::to_string)
            .collect();
        for sibling in siblings {
            tree.remove_child(section, &sibling);
        }
        tree.rename_child(section, &line, "undo port link-type");
    }
}

/// A route-policy node is removed by name and node number only.
pub fn route_policy(tree: &mut ConfTree) {
    if tree.vendor() != Vendor::Huawei {
        return;
    }
    let root = tree.root();
    for id in tree.child_ids(root) {
        let line = tree.line(id).to_string();
        let words: Vec<&str> = line.split_whitespace().collect();
        if let ["undo", "route-policy", name, "permit" | "deny", "node", node] = words[..] {
            if node.chars().all(|c| c.is_ascii_digit()) {
                let short = format!("undo route-policy {name} node {node}");
                tree.rename_child(root, &line, &short);
            }
        }
    }
}

/// A prefix-list entry is replaced by re-adding its index, or removed by index.
pub fn prefix_list(tree: &mut ConfTree) {
    if tree.vendor() != Vendor::Huawei {
        return;
    }
    let root = tree.root();
    for id in tree.child_ids(root) {
        let line = tree.line(id).to_string();
        let words: Vec<&str> = line.split_whitespace().collect();
        let ["undo", "ip", kind @ ("ip-prefix" | "ipv6-prefix"), name, "index", index, _, ..] =
            words[..]
        else {
            continue;
        };
        let entry = format!("ip {kind} {name} index {index} ");
        let readded = tree
            .children(root)
            .any(|child| tree.line(child).starts_with(&entry));
        if readded {
            tree.remove_child(root, &line);
        } else {
            tree.rename_child(root, &line, &format!("undo ip {kind} {name} index {index}"));
        }
    }
}

#[derive(Default)]
struct UserLines {
    undo: Vec<String>,
    add: Vec<String>,
    undo_password: Option<String>,
    add_password: Option<String>,
}

/// Local user accounts inside `aaa`.
///
/// Password hashes differ between devices, so a target password without a
/// hash means "keep the current one". Users whose password is removed and
/// never re-added are deleted as a whole.
pub fn local_user(tree: &mut ConfTree) {
    if tree.vendor() != Vendor::Huawei {
        return;
    }
    let root = tree.root();
    let Some(aaa) = tree.child(root, "aaa") else {
        return;
    };

    let mut users: IndexMap<String, UserLines> = IndexMap::new();
    for id in tree.children(aaa) {
        let line = tree.line(id);
        if let Some(rest) = line.strip_prefix("undo local-user ") {
            let Some((user, attr)) = rest.split_once(' ') else {
                continue;
            };
            let entry = users.entry(user.to_string()).or_default();
            entry.undo.push(line.to_string());
            if attr.starts_with("password ") {
                entry.undo_password = Some(line.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("local-user ") {
            let Some((user, attr)) = rest.split_once(' ') else {
                continue;
            };
            let entry = users.entry(user.to_string()).or_default();
            entry.add.push(line.to_string());
            if attr.starts_with("password ") {
                entry.add_password = Some(line.to_string());
            }
        }
    }

    for (user, lines) in &users {
        if lines.undo_password.is_some() && lines.add.is_empty() {
            let mut undo = lines.undo.iter();
            if let Some(first) = undo.next() {
                tree.rename_child(aaa, first, &format!("undo local-user {user}"));
            }
            for line in undo {
                tree.remove_child(aaa, line);
            }
            continue;
        }

        match (&lines.undo_password, &lines.add_password) {
            (Some(undo), Some(add)) => {
                tree.remove_child(aaa, undo);
                if !has_password_hash(add) {
                    tree.remove_child(aaa, add);
                }
            }
            (None, Some(add)) if !has_password_hash(add) => {
                for line in &lines.add {
                    tree.remove_child(aaa, line);
                }
            }
            _ => {}
        }

        for line in &lines.undo {
            let level = format!("undo local-user {user} level ");
            if line.starts_with(&level) {
                tree.rename_child(aaa, line, &format!("undo local-user {user} level"));
            }
        }
    }

    if !tree.has_children(aaa) {
        tree.remove_child(root, "aaa");
    }
}

/// `local-user U password <cipher-kind> <hash>` carries a hash; without it the
/// line only names the cipher kind.
fn has_password_hash(line: &str) -> bool {
    line.split_whitespace().count() > 4
}

/// Shared keys are stored as hashes, so a changed hash is replaced rather
/// than removed, and a target without a secret keeps the current key.
pub fn shared_key(tree: &mut ConfTree) {
    if tree.vendor() != Vendor::Huawei {
        return;
    }
    let root = tree.root();
    prune_shared_keys(tree, root);
}

fn prune_shared_keys(tree: &mut ConfTree, section: NodeId) {
    for id in tree.child_ids(section) {
        if !tree.has_children(id) {
            continue;
        }
        prune_shared_keys(tree, id);
        if !tree.has_children(id) {
            let line = tree.line(id).to_string();
            tree.remove_child(section, &line);
        }
    }

    let lines: Vec<String> = tree
        .children(section)
        .map(|id| tree.line(id).to_string())
        .collect();
    for undo in &lines {
        let Some(command) = undo.strip_prefix("undo ") else {
            continue;
        };
        let Some(at) = command.find("shared-key cipher ") else {
            continue;
        };
        let key = &command[..at + "shared-key cipher".len()];
        let readded = lines
            .iter()
            .find(|line| *line == key || line.starts_with(&format!("{key} ")));
        if let Some(add) = readded {
            tree.remove_child(section, undo);
            if add == key {
                tree.remove_child(section, add);
            }
        }
    }
}

/// Peers and globals come before the address families that reference them.
pub fn bgp(tree: &mut ConfTree) {
    if tree.vendor() != Vendor::Huawei {
        return;
    }
    let root = tree.root();
    for id in tree.child_ids(root) {
        if !is_bgp_process(tree.line(id)) {
            continue;
        }
        let (leaves, sections): (Vec<NodeId>, Vec<NodeId>) = tree
            .children(id)
            .partition(|child| !tree.has_children(*child));
        let order: Vec<NodeId> = leaves.into_iter().chain(sections).collect();
        tree.set_children_order(id, &order);
    }
}

fn is_bgp_process(line: &str) -> bool {
    line.strip_prefix("bgp ")
        .is_some_and(|asn| !asn.is_empty() && asn.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::{bgp, has_password_hash, interface, local_user, shared_key};
    use crate::parser::parse;
    use crate::vendor::Vendor;
    use pretty_assertions::assert_eq;

    #[test]
    fn rules_ignore_other_vendors() {
        let mut tree = parse(Vendor::Arista, "undo interface Ethernet1\n");
        interface(&mut tree);
        assert_eq!(tree.config(), "undo interface Ethernet1\n!");
    }

    #[test]
    fn password_hash_detection() {
        assert!(has_password_hash("local-user u password irreversible-cipher $1a$x"));
        assert!(!has_password_hash("local-user u password irreversible-cipher"));
    }

    #[test]
    fn local_user_keeps_unrelated_aaa_lines() {
        let mut tree = parse(
            Vendor::Huawei,
            "aaa\n undo local-user policy security-enhance\n domain default\n",
        );
        local_user(&mut tree);
        assert_eq!(
            tree.config(),
            "aaa\n undo local-user policy security-enhance\n domain default\n#"
        );
    }

    #[test]
    fn shared_key_leaves_unrelated_sections() {
        let mut tree = parse(
            Vendor::Huawei,
            "radius-server template R\n undo radius-server shared-key cipher old\n radius-server shared-key cipher\nsysname x\n",
        );
        shared_key(&mut tree);
        assert_eq!(tree.config(), "sysname x\n#");
    }

    #[test]
    fn bgp_orders_leaves_first() {
        let mut tree = parse(
            Vendor::Huawei,
            "bgp 100\n ipv4-family unicast\n  peer P enable\n peer P as-number 200\n",
        );
        bgp(&mut tree);
        assert_eq!(
            tree.config(),
            "bgp 100\n peer P as-number 200\n ipv4-family unicast\n  peer P enable\n#"
        );
    }
}
