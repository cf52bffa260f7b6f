//! Collection payloads of set attribute values.
//!
//! Sets of strings and sets of domains keep an integer rank per element:
//! the sequence number of its first insertion. Lookups use the sorted key
//! order while iteration and serialization follow the rank.

use super::Domain;

use ipnet::IpNet;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Sorted set whose elements carry an insertion rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSet<K: Ord> {
    ranks: BTreeMap<K, usize>,
}

impl<K: Ord + Clone> RankedSet<K> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            ranks: BTreeMap::new(),
        }
    }

    /// Insert an element; an element already present keeps its rank.
    pub fn insert(&mut self, key: K) {
        let rank = self.ranks.len();
        self.ranks.entry(key).or_insert(rank);
    }

    /// Check membership.
    pub fn contains(&self, key: &K) -> bool {
        self.ranks.contains_key(key)
    }

    /// Rank of an element.
    pub fn rank(&self, key: &K) -> Option<usize> {
        self.ranks.get(key).copied()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Elements in sorted key order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &K> {
        self.ranks.keys()
    }

    /// Elements in rank order.
    pub fn iter_ranked(&self) -> impl Iterator<Item = &K> {
        let mut items: Vec<(&K, usize)> = self.ranks.iter().map(|(k, r)| (k, *r)).collect();
        items.sort_by_key(|(_, r)| *r);
        items.into_iter().map(|(k, _)| k)
    }

    /// Elements present in both sets, ranked as in `self`.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for key in self.iter_ranked() {
            if other.contains(key) {
                out.insert(key.clone());
            }
        }
        out
    }
}

impl<K: Ord + Clone> Default for RankedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> FromIterator<K> for RankedSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// Ranked set of strings.
pub type StringSet = RankedSet<String>;

/// Ranked set of domains with parent-domain matching.
pub type DomainSet = RankedSet<Domain>;

impl DomainSet {
    /// Check if the domain or any of its parent domains is in the set.
    pub fn contains_domain(&self, domain: &Domain) -> bool {
        domain
            .ancestors()
            .any(|name| self.ranks.contains_key(&Domain::from_normalized(name)))
    }
}

/// Set of networks in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkSet {
    networks: Vec<IpNet>,
}

impl NetworkSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a network; duplicates are ignored.
    pub fn insert(&mut self, network: IpNet) {
        let network = network.trunc();
        if !self.networks.contains(&network) {
            self.networks.push(network);
        }
    }

    /// Check if any network of the set contains the address.
    pub fn contains_address(&self, addr: &IpAddr) -> bool {
        self.networks.iter().any(|n| n.contains(addr))
    }

    /// Check if the exact network is in the set.
    pub fn contains(&self, network: &IpNet) -> bool {
        self.networks.contains(&network.trunc())
    }

    /// Networks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &IpNet> {
        self.networks.iter()
    }

    /// Number of networks.
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Networks present in both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        self.networks
            .iter()
            .filter(|n| other.contains(n))
            .copied()
            .collect()
    }
}

impl FromIterator<IpNet> for NetworkSet {
    fn from_iter<I: IntoIterator<Item = IpNet>>(iter: I) -> Self {
        let mut set = Self::new();
        for n in iter {
            set.insert(n);
        }
        set
    }
}
