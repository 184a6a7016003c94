//! Cahn-Ingold-Prelog stereodescriptor assignment (IUPAC 2013 Rules 1-5).
//!
//! For every stereocenter candidate the engine builds a hierarchical digraph
//! of the molecular graph: each path from the root atom is expanded until it
//! reaches a terminal atom, revisits an ancestor (ring closure), or crosses
//! a multiple bond, the latter two producing terminal duplicate nodes.
//! Substituent branches are then ranked by the sequence rules in order
//! (1a, 1b, 2, 3, 4a, 4b, 4c, 5) and the winning permutation is turned into
//! R/S, r/s, or E/Z through the 3D geometry of the top-ranked substituents.

use crate::bond::{BondOrder, BondTarget};
use crate::consts::{self, TRIGONALITY_MIN};
use crate::molecule::{Molecule3D, StereoDescriptor};
use crate::rings::RingSet;
use crate::vector::Vector;
use itertools::Itertools;
use log::{debug, warn};
use nohash_hasher::{IntMap, IntSet};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

/// Failure of a single-center computation. The batch entry point catches
/// these, logs them, and stores [`StereoDescriptor::Undetermined`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipError {
    AtomOutOfBounds(usize),
    MissingPosition(usize),
    NotADoubleBond(usize, usize),
    DegenerateGeometry(usize),
}

impl Display for CipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CipError::AtomOutOfBounds(index) => {
                write!(f, "atom index {index} is out of bounds")
            }
            CipError::MissingPosition(index) => {
                write!(f, "atom {index} has no 3D position")
            }
            CipError::NotADoubleBond(atom1, atom2) => {
                write!(f, "no double bond between atoms {atom1} and {atom2}")
            }
            CipError::DegenerateGeometry(index) => {
                write!(f, "substituents of atom {index} do not define a plane")
            }
        }
    }
}

impl std::error::Error for CipError {}

/// The sequence rules, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rule {
    Rule1a,
    Rule1b,
    Rule2,
    Rule3,
    Rule4a,
    Rule4b,
    Rule4c,
    Rule5,
}

const RULE_ORDER: [Rule; 8] = [
    Rule::Rule1a,
    Rule::Rule1b,
    Rule::Rule2,
    Rule::Rule3,
    Rule::Rule4a,
    Rule::Rule4b,
    Rule::Rule4c,
    Rule::Rule5,
];

fn rules_through(max_rule: Rule) -> &'static [Rule] {
    let end = RULE_ORDER
        .iter()
        .position(|&rule| rule == max_rule)
        .map(|index| index + 1)
        .unwrap_or(RULE_ORDER.len());
    &RULE_ORDER[..end]
}

// Pairwise comparison scores. Tie-break scores get multiplied by the sphere
// they were decided in, so the smallest non-tied magnitude is the
// shallowest, decisive one. IGNORE marks "rule not applicable to this pair".
const TIED: i32 = 0;
const A_WINS: i32 = -1;
const B_WINS: i32 = 1;
const IGNORE: i32 = i32::MIN;

/// Only bonds between first-row p-block elements keep their multiplicity in
/// the digraph; all other multiple bonds are treated as single.
fn multiple_bond_retained(elem_no: u8) -> bool {
    (3..=10).contains(&elem_no)
}

fn effective_order(mol: &Molecule3D, atom: usize, bond: &BondTarget) -> u8 {
    let order = bond.order();
    if order > 1
        && multiple_bond_retained(mol.get_atomic_number(atom))
        && multiple_bond_retained(mol.get_atomic_number(bond.target()))
    {
        order
    } else {
        1
    }
}

fn has_effective_double(mol: &Molecule3D, atom1: usize, atom2: usize) -> bool {
    mol.get_atom_bonds(atom1)
        .map(|bonds| {
            bonds.iter().any(|bond| {
                bond.target() == atom2
                    && bond.bond_order() == BondOrder::Double
                    && effective_order(mol, atom1, bond) == 2
            })
        })
        .unwrap_or(false)
}

/// One node of the hierarchical digraph. Duplicates and the shared
/// placeholder (phantom atom / lone pair) are terminal.
#[derive(Debug, Clone)]
struct Node {
    atom: Option<usize>,
    elem_no: u8,
    mass: f64,
    parent: Option<usize>,
    children: Vec<usize>,
    sphere: usize,
    root_distance: usize,
    is_duplicate: bool,
    aux_ez: Option<StereoDescriptor>,
    aux_chirality: StereoDescriptor,
}

impl Node {
    fn placeholder() -> Node {
        Node {
            atom: None,
            elem_no: 0,
            mass: 0.0,
            parent: None,
            children: Vec::new(),
            sphere: 0,
            root_distance: 0,
            is_duplicate: false,
            aux_ez: None,
            aux_chirality: StereoDescriptor::None,
        }
    }
}

/// A hierarchical digraph rooted at one candidate atom, plus the sorting
/// state the sequence rules need.
struct Digraph<'a> {
    mol: &'a Molecule3D,
    nodes: Vec<Node>,
    root: usize,
    placeholder: usize,
    parent_atom: Option<usize>,
    first_sphere: IntMap<u64, usize>,
    rule3_prepared: bool,
    rule4_prepared: bool,
    aux_chain: IntSet<usize>,
}

/// First-occurrence spheres are tracked per root-substituent branch, so a
/// ring closure inherits the distance recorded along its own branch only.
fn branch_key(branch: usize, atom: usize) -> u64 {
    ((branch as u64) << 32) | atom as u64
}

impl<'a> Digraph<'a> {
    /// Builds the full digraph rooted at `root_atom`. With `parent_atom`
    /// set, the root is treated as entered through that atom (used for the
    /// two ends of a double bond). `aux_chain` lists the atoms whose own
    /// evaluation this digraph serves; they never get auxiliary descriptors
    /// of their own. A `rings` collector, when given, is fed every ring
    /// closure encountered during the walk.
    fn build(
        mol: &'a Molecule3D,
        root_atom: usize,
        parent_atom: Option<usize>,
        aux_chain: IntSet<usize>,
        mut rings: Option<&mut RingSet>,
    ) -> Digraph<'a> {
        let mut digraph = Digraph {
            mol,
            nodes: vec![Node::placeholder()],
            root: 0,
            placeholder: 0,
            parent_atom,
            first_sphere: IntMap::default(),
            rule3_prepared: false,
            rule4_prepared: false,
            aux_chain,
        };
        let root = digraph.push_real(root_atom, None, 0);
        digraph.root = root;
        let mut path = IntSet::default();
        if let Some(parent) = parent_atom {
            // The far alkene end counts as already visited; any other route
            // back to it closes a ring.
            path.insert(parent);
        }
        digraph.expand(root, parent_atom, 0, &mut path, &mut rings);
        digraph
    }

    fn push_real(&mut self, atom: usize, parent: Option<usize>, sphere: usize) -> usize {
        self.nodes.push(Node {
            atom: Some(atom),
            elem_no: self.mol.get_atomic_number(atom),
            mass: self.mol.get_mass(atom).unwrap_or(0.0),
            parent,
            children: Vec::new(),
            sphere,
            root_distance: sphere,
            is_duplicate: false,
            aux_ez: None,
            aux_chirality: StereoDescriptor::None,
        });
        self.nodes.len() - 1
    }

    /// Duplicates never carry an isotope; Rule 2 sees the element's
    /// standard atomic weight.
    fn push_duplicate(
        &mut self,
        atom: usize,
        parent: usize,
        sphere: usize,
        root_distance: usize,
    ) -> usize {
        let elem_no = self.mol.get_atomic_number(atom);
        self.nodes.push(Node {
            atom: Some(atom),
            elem_no,
            mass: consts::standard_atomic_weight(elem_no).unwrap_or(0.0),
            parent: Some(parent),
            children: vec![self.placeholder; 3],
            sphere,
            root_distance,
            is_duplicate: true,
            aux_ez: None,
            aux_chirality: StereoDescriptor::None,
        });
        self.nodes.len() - 1
    }

    fn expand(
        &mut self,
        node: usize,
        came_from: Option<usize>,
        branch: usize,
        path: &mut IntSet<usize>,
        rings: &mut Option<&mut RingSet>,
    ) {
        let Some(atom) = self.nodes[node].atom else {
            return;
        };
        let sphere = self.nodes[node].sphere;
        let root_distance = self.nodes[node].root_distance;
        let want = if self.nodes[node].parent.is_none() { 4 } else { 3 };
        let bonds: Vec<BondTarget> = self
            .mol
            .get_atom_bonds(atom)
            .map(|bonds| bonds.iter().filter(|bond| bond.is_covalent()).copied().collect())
            .unwrap_or_default();
        // Hypervalent atoms are left unexpanded everywhere.
        if bonds.len() > 4 {
            let mut children = Vec::new();
            while children.len() < want {
                children.push(self.placeholder);
            }
            self.nodes[node].children = children;
            return;
        }
        path.insert(atom);
        let root_atom = self.nodes[self.root].atom;
        let mut children = Vec::new();
        let mut skipped_parent = false;
        for bond in &bonds {
            let other = bond.target();
            let order = effective_order(self.mol, atom, bond);
            if !skipped_parent && Some(other) == came_from {
                skipped_parent = true;
                for _ in 1..order {
                    children.push(self.push_duplicate(other, node, sphere + 1, root_distance));
                }
            } else if path.contains(&other) {
                let closure_distance = if Some(other) == root_atom {
                    0
                } else if Some(other) == self.parent_atom {
                    1
                } else {
                    self.first_sphere
                        .get(&branch_key(branch, other))
                        .copied()
                        .unwrap_or(sphere + 1)
                };
                children.push(self.push_duplicate(other, node, sphere + 1, closure_distance));
                if let Some(collector) = rings.as_deref_mut() {
                    self.register_ring(node, other, collector);
                }
            } else {
                let child = self.push_real(other, Some(node), sphere + 1);
                let child_branch = if node == self.root { child } else { branch };
                self.first_sphere
                    .entry(branch_key(child_branch, other))
                    .or_insert(sphere + 1);
                children.push(child);
                for _ in 1..order {
                    children.push(self.push_duplicate(other, node, sphere + 1, root_distance));
                }
            }
        }
        while children.len() < want {
            children.push(self.placeholder);
        }
        self.nodes[node].children = children.clone();
        for child in children {
            if child != self.placeholder && !self.nodes[child].is_duplicate {
                let child_branch = if node == self.root { child } else { branch };
                self.expand(child, Some(atom), child_branch, path, rings);
            }
        }
        path.remove(&atom);
    }

    /// Walks the ancestor chain from the node that closed a ring back to the
    /// revisited atom and registers the enclosed cycle.
    fn register_ring(&self, from: usize, closure_atom: usize, rings: &mut RingSet) {
        let mut members: IntSet<usize> = IntSet::default();
        members.insert(closure_atom);
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let Some(atom) = self.nodes[id].atom else {
                return;
            };
            if atom == closure_atom {
                rings.add(members);
                return;
            }
            members.insert(atom);
            cursor = self.nodes[id].parent;
        }
    }

    fn child_at(&self, node: usize, index: usize) -> usize {
        self.nodes[node]
            .children
            .get(index)
            .copied()
            .unwrap_or(self.placeholder)
    }
}

impl<'a> Digraph<'a> {
    fn prepare(&mut self, rule: Rule) {
        if rule == Rule::Rule3 && !self.rule3_prepared {
            self.prepare_rule3();
        }
        if rule >= Rule::Rule4a && !self.rule4_prepared {
            self.prepare_rule4();
        }
    }

    /// Full-precedence comparison of two sibling branches: rules are applied
    /// in order, each exhausted over the whole branch before the next one is
    /// consulted. Returns `A_WINS`, `B_WINS`, or `TIED`.
    fn compare_pair(&mut self, a: usize, b: usize, max_rule: Rule) -> i32 {
        if a == b {
            return TIED;
        }
        for &rule in rules_through(max_rule) {
            self.prepare(rule);
            let score = match rule {
                Rule::Rule4b => self.compare_mata(a, b, false),
                Rule::Rule5 => self.compare_mata(a, b, true),
                _ => self.break_tie(a, b, 0, rule),
            };
            if score != TIED && score != IGNORE {
                return if score < 0 { A_WINS } else { B_WINS };
            }
        }
        TIED
    }

    /// Hierarchical comparison under a single rule: the two nodes first,
    /// then their sorted children pairwise in the same sphere, then each
    /// child pair in depth. The shallowest decision wins, which the
    /// sphere-scaled scores encode.
    fn break_tie(&mut self, a: usize, b: usize, sphere: usize, rule: Rule) -> i32 {
        if a == b {
            return TIED;
        }
        let score = self.check_rule(a, b, rule);
        if score != TIED {
            return score * (sphere as i32 + 1);
        }
        let score = self.check_duplicate(a, b);
        if score != TIED {
            return score * (sphere as i32 + 1);
        }
        if self.nodes[a].children.is_empty() || self.nodes[b].children.is_empty() {
            return TIED;
        }
        self.sort_children(a, rule);
        self.sort_children(b, rule);
        let width = self.nodes[a].children.len().max(self.nodes[b].children.len());
        for index in 0..width {
            let child_a = self.child_at(a, index);
            let child_b = self.child_at(b, index);
            let mut score = self.check_rule(child_a, child_b, rule);
            if score == TIED {
                score = self.check_duplicate(child_a, child_b);
            }
            if score != TIED {
                return score * (sphere as i32 + 2);
            }
        }
        let mut best = TIED;
        for index in 0..width {
            let child_a = self.child_at(a, index);
            let child_b = self.child_at(b, index);
            let score = self.break_tie(child_a, child_b, sphere + 1, rule);
            if score != TIED && (best == TIED || score.abs() < best.abs()) {
                best = score;
            }
        }
        best
    }

    /// Sorts a node's children into descending priority, using the full
    /// rule chain up to `max_rule`. Stable, so tied branches keep their
    /// construction order.
    fn sort_children(&mut self, node: usize, max_rule: Rule) {
        let mut children = self.nodes[node].children.clone();
        for i in 1..children.len() {
            let mut j = i;
            while j > 0 {
                if self.compare_pair(children[j - 1], children[j], max_rule) == B_WINS {
                    children.swap(j - 1, j);
                    j -= 1;
                } else {
                    break;
                }
            }
        }
        self.nodes[node].children = children;
    }

    /// Single-node comparison under one rule. Rules 4b and 5 compare whole
    /// branches and are handled in [`Digraph::compare_mata`] instead.
    fn check_rule(&self, a: usize, b: usize, rule: Rule) -> i32 {
        let node_a = &self.nodes[a];
        let node_b = &self.nodes[b];
        match rule {
            Rule::Rule1a => order_desc(node_a.elem_no, node_b.elem_no),
            Rule::Rule1b => {
                if node_a.is_duplicate && node_b.is_duplicate {
                    order_desc(node_b.root_distance, node_a.root_distance)
                } else {
                    TIED
                }
            }
            Rule::Rule2 => match node_a.mass.partial_cmp(&node_b.mass) {
                Some(Ordering::Greater) => A_WINS,
                Some(Ordering::Less) => B_WINS,
                _ => TIED,
            },
            Rule::Rule3 => {
                // An end that could not be resolved counts as cis and trans
                // at once, so it ties against everything.
                if node_a.aux_ez == Some(StereoDescriptor::Undetermined)
                    || node_b.aux_ez == Some(StereoDescriptor::Undetermined)
                {
                    return TIED;
                }
                order_desc(rule3_rank(node_a.aux_ez), rule3_rank(node_b.aux_ez))
            }
            Rule::Rule4a => order_desc(stereo_class(node_a), stereo_class(node_b)),
            Rule::Rule4c => order_desc(
                pseudo_rank(node_a.aux_chirality),
                pseudo_rank(node_b.aux_chirality),
            ),
            Rule::Rule4b | Rule::Rule5 => TIED,
        }
    }

    /// The built-in final tie-break under every rule: a phantom duplicate
    /// never outranks a real atom of the same element and mass.
    fn check_duplicate(&self, a: usize, b: usize) -> i32 {
        order_desc(!self.nodes[a].is_duplicate, !self.nodes[b].is_duplicate)
    }

    /// Rule 3 data: every in-tree double bond gets the E/Z descriptor of the
    /// underlying molecular bond stored on its far-end node.
    fn prepare_rule3(&mut self) {
        self.rule3_prepared = true;
        for id in 0..self.nodes.len() {
            let node = &self.nodes[id];
            if node.is_duplicate {
                continue;
            }
            let (Some(atom), Some(parent)) = (node.atom, node.parent) else {
                continue;
            };
            let Some(parent_atom) = self.nodes[parent].atom else {
                continue;
            };
            if !has_effective_double(self.mol, parent_atom, atom) {
                continue;
            }
            let aux = match evaluate_ene(self.mol, parent_atom, atom, Rule::Rule2) {
                Ok(EneOutcome::Assigned(descriptor, _, _)) => Some(descriptor),
                Ok(EneOutcome::Indeterminate) => Some(StereoDescriptor::Undetermined),
                Ok(_) => None,
                Err(_) => Some(StereoDescriptor::Undetermined),
            };
            self.nodes[id].aux_ez = aux;
        }
    }

    /// Rules 4/5 data: every node that could itself be a stereocenter gets
    /// its own descriptor, evaluated with the full rule set in a digraph
    /// rooted at that atom. Atoms already under evaluation further up the
    /// auxiliary chain are skipped, which bounds the recursion.
    fn prepare_rule4(&mut self) {
        self.rule4_prepared = true;
        let mut chain = self.aux_chain.clone();
        if let Some(root_atom) = self.nodes[self.root].atom {
            chain.insert(root_atom);
        }
        let mut computed: IntMap<usize, StereoDescriptor> = IntMap::default();
        for id in 0..self.nodes.len() {
            if id == self.root {
                continue;
            }
            let node = &self.nodes[id];
            if node.is_duplicate {
                continue;
            }
            let Some(atom) = node.atom else {
                continue;
            };
            if chain.contains(&atom) || !could_be_chiral_atom(self.mol, atom) {
                continue;
            }
            if let Some(&descriptor) = computed.get(&atom) {
                self.nodes[id].aux_chirality = descriptor;
                continue;
            }
            if let Ok(outcome) = evaluate_atom_inner(self.mol, atom, Rule::Rule5, &chain) {
                if let Some(descriptor) = outcome.descriptor {
                    computed.insert(atom, descriptor);
                    self.nodes[id].aux_chirality = descriptor;
                }
            }
        }
    }
}

fn order_desc<T: Ord>(a: T, b: T) -> i32 {
    match a.cmp(&b) {
        Ordering::Greater => A_WINS,
        Ordering::Less => B_WINS,
        Ordering::Equal => TIED,
    }
}

fn rule3_rank(aux_ez: Option<StereoDescriptor>) -> u8 {
    match aux_ez {
        Some(StereoDescriptor::Z) => 2,
        Some(StereoDescriptor::E) => 1,
        _ => 0,
    }
}

/// Rule 4a classes: chiral units, then pseudo-asymmetric units, then
/// everything else.
fn stereo_class(node: &Node) -> u8 {
    match node.aux_chirality {
        StereoDescriptor::R | StereoDescriptor::S => return 2,
        StereoDescriptor::PseudoR | StereoDescriptor::PseudoS => return 1,
        _ => {}
    }
    match node.aux_ez {
        Some(StereoDescriptor::Z) | Some(StereoDescriptor::E) => 2,
        _ => 0,
    }
}

fn pseudo_rank(descriptor: StereoDescriptor) -> u8 {
    match descriptor {
        StereoDescriptor::PseudoR => 2,
        StereoDescriptor::PseudoS => 1,
        _ => 0,
    }
}

/// The outcome of ranking a root's substituents: the descending priority
/// order, whether every adjacent pair was separated, the number of distinct
/// priority ranks produced, and whether a lone Rule 5 decision makes the
/// descriptor pseudo-asymmetric (lowercase).
struct RootRanking {
    order: Vec<usize>,
    resolved: bool,
    distinct_ranks: usize,
    pseudo: bool,
}

impl<'a> Digraph<'a> {
    /// Ranks the root's substituents, refining the order rule by rule until
    /// no adjacent pair ties or the rules through `max_rule` run out.
    fn rank_root(&mut self, max_rule: Rule) -> RootRanking {
        let mut order = self.nodes[self.root].children.clone();
        let mut ties_entering_rule5 = usize::MAX;
        let mut ties = order.len().saturating_sub(1);
        for &rule in rules_through(max_rule) {
            for i in 1..order.len() {
                let mut j = i;
                while j > 0 {
                    if self.compare_pair(order[j - 1], order[j], rule) == B_WINS {
                        order.swap(j - 1, j);
                        j -= 1;
                    } else {
                        break;
                    }
                }
            }
            ties = (1..order.len())
                .filter(|&i| self.compare_pair(order[i - 1], order[i], rule) == TIED)
                .count();
            if rule == Rule::Rule4c {
                ties_entering_rule5 = ties;
            }
            if ties == 0 {
                // A center that needed exactly one Rule 5 decision is
                // pseudo-asymmetric; two independent decisions restore a
                // true chirality center.
                let pseudo = rule == Rule::Rule5 && ties_entering_rule5 == 1;
                let distinct_ranks = order.len();
                return RootRanking {
                    order,
                    resolved: true,
                    distinct_ranks,
                    pseudo,
                };
            }
        }
        let distinct_ranks = order.len() - ties;
        RootRanking {
            order,
            resolved: false,
            distinct_ranks,
            pseudo: false,
        }
    }

    /// Flattens a branch sphere-major into its chirality descriptors, with
    /// children walked in priority order. Every real atom contributes one
    /// entry; '~' stands in for atoms that carry no descriptor, so two
    /// branches of equal constitution always produce aligned lists.
    fn mata_string(&mut self, branch: usize, sort_rule: Rule) -> Vec<(usize, char)> {
        let mut flattened = Vec::new();
        let mut queue = VecDeque::from([branch]);
        while let Some(node) = queue.pop_front() {
            if node == self.placeholder || self.nodes[node].is_duplicate {
                continue;
            }
            let symbol = match self.nodes[node].aux_chirality {
                StereoDescriptor::R => 'R',
                StereoDescriptor::S => 'S',
                StereoDescriptor::PseudoR => 'r',
                StereoDescriptor::PseudoS => 's',
                _ => '~',
            };
            flattened.push((self.nodes[node].sphere, symbol));
            if self.nodes[node].children.is_empty() {
                continue;
            }
            self.sort_children(node, sort_rule);
            for &child in &self.nodes[node].children {
                if child != self.placeholder {
                    queue.push_back(child);
                }
            }
        }
        flattened
    }

    /// Rules 4b and 5: the Mata like/unlike comparison of two branches.
    /// Rule 4b references each branch against its own predominant
    /// descriptor; Rule 5 fixes the reference to R. Branches whose
    /// descriptor lists differ in length are not comparable under these
    /// rules and yield `IGNORE`.
    fn compare_mata(&mut self, a: usize, b: usize, fixed_reference: bool) -> i32 {
        let sort_rule = if fixed_reference { Rule::Rule4c } else { Rule::Rule4a };
        let list_a = self.mata_string(a, sort_rule);
        let list_b = self.mata_string(b, sort_rule);
        if list_a.len() != list_b.len() {
            return IGNORE;
        }
        if list_a.is_empty() {
            return TIED;
        }
        if fixed_reference {
            let pattern_a = like_unlike(&list_a, 'R');
            let pattern_b = like_unlike(&list_b, 'R');
            return match first_divergence(&pattern_a, &pattern_b) {
                Some((_, score)) => score,
                None => TIED,
            };
        }
        // A balanced branch has no single reference; try both and keep
        // whichever pairing diverges earliest.
        let mut outcomes: Vec<(usize, i32)> = Vec::new();
        for &reference_a in &reference_choices(&list_a) {
            for &reference_b in &reference_choices(&list_b) {
                let pattern_a = like_unlike(&list_a, reference_a);
                let pattern_b = like_unlike(&list_b, reference_b);
                if let Some(outcome) = first_divergence(&pattern_a, &pattern_b) {
                    outcomes.push(outcome);
                }
            }
        }
        let Some(&(earliest, _)) = outcomes.iter().min_by_key(|(position, _)| position) else {
            // No like/unlike divergence at all; pseudo-asymmetric and
            // absent descriptors still order the branches, R against S
            // does not (separating those is Rule 5's job).
            return lexical_divergence(&list_a, &list_b);
        };
        let decisive: Vec<i32> = outcomes
            .iter()
            .filter(|(position, _)| *position == earliest)
            .map(|&(_, score)| score)
            .collect();
        if decisive.iter().all(|&score| score == decisive[0]) {
            decisive[0]
        } else {
            TIED
        }
    }
}

/// The branch reference descriptor: the majority of R versus S within the
/// shallowest sphere that has either. Both when balanced, none when the
/// branch carries no chiral unit at all.
fn reference_choices(list: &[(usize, char)]) -> Vec<char> {
    let Some(first_sphere) = list
        .iter()
        .filter(|&&(_, symbol)| symbol == 'R' || symbol == 'S')
        .map(|&(sphere, _)| sphere)
        .min()
    else {
        return Vec::new();
    };
    let r_count = list
        .iter()
        .filter(|&&(sphere, symbol)| sphere == first_sphere && symbol == 'R')
        .count();
    let s_count = list
        .iter()
        .filter(|&&(sphere, symbol)| sphere == first_sphere && symbol == 'S')
        .count();
    match r_count.cmp(&s_count) {
        Ordering::Greater => vec!['R'],
        Ordering::Less => vec!['S'],
        Ordering::Equal => vec!['R', 'S'],
    }
}

/// R and S become 'l' or 'u' against the reference; pseudo-asymmetric and
/// absent descriptors pass through unchanged.
fn like_unlike(list: &[(usize, char)], reference: char) -> Vec<char> {
    list.iter()
        .map(|&(_, symbol)| match symbol {
            'R' | 'S' if symbol == reference => 'l',
            'R' | 'S' => 'u',
            other => other,
        })
        .collect()
}

/// Pattern ordering at a divergent position: like, then unlike, then r
/// before s, then no descriptor.
fn pattern_rank(symbol: char) -> u8 {
    match symbol {
        'l' => 0,
        'u' => 1,
        'r' => 2,
        's' => 3,
        _ => 4,
    }
}

/// First position where the patterns differ; the higher-ordered symbol wins.
fn first_divergence(pattern_a: &[char], pattern_b: &[char]) -> Option<(usize, i32)> {
    pattern_a
        .iter()
        .zip(pattern_b.iter())
        .position(|(a, b)| a != b)
        .map(|position| {
            let score = if pattern_rank(pattern_a[position]) < pattern_rank(pattern_b[position]) {
                A_WINS
            } else {
                B_WINS
            };
            (position, score)
        })
}

fn lexical_rank(symbol: char) -> u8 {
    match symbol {
        'R' | 'S' => 0,
        'r' => 1,
        's' => 2,
        _ => 3,
    }
}

/// Rule 4b fallback when no like/unlike divergence exists: R and S compare
/// equal here, but a descriptor beats none and r precedes s.
fn lexical_divergence(list_a: &[(usize, char)], list_b: &[(usize, char)]) -> i32 {
    for (&(_, symbol_a), &(_, symbol_b)) in list_a.iter().zip(list_b.iter()) {
        match lexical_rank(symbol_a).cmp(&lexical_rank(symbol_b)) {
            Ordering::Less => return A_WINS,
            Ordering::Greater => return B_WINS,
            Ordering::Equal => {}
        }
    }
    TIED
}

/// Turns a ranked substituent order into R or S: the plane through the three
/// highest-priority positions, checked against the fourth (or against the
/// center itself when a lone pair ranks last). Positive side is R,
/// everything else including the plane itself is S.
fn handedness(
    mol: &Molecule3D,
    center: usize,
    digraph: &Digraph,
    order: &[usize],
) -> Result<StereoDescriptor, CipError> {
    let center_position = mol
        .get_atom_position(center)
        .ok_or(CipError::MissingPosition(center))?;
    let mut positions: Vec<Vector> = Vec::new();
    let mut seen: IntSet<usize> = IntSet::default();
    for &node in order {
        let Some(atom) = digraph.nodes[node].atom else {
            continue;
        };
        if !seen.insert(atom) {
            continue;
        }
        let position = mol
            .get_atom_position(atom)
            .ok_or(CipError::MissingPosition(atom))?;
        positions.push(position);
        if positions.len() == 4 {
            break;
        }
    }
    if positions.len() < 3 {
        return Err(CipError::DegenerateGeometry(center));
    }
    let fourth = positions.get(3).copied().unwrap_or(center_position);
    let normal = Vector::normal_through_points(&positions[0], &positions[1], &positions[2]);
    let signed = fourth.distance_to_plane(&positions[0], &normal);
    Ok(if signed > 0.0 {
        StereoDescriptor::R
    } else {
        StereoDescriptor::S
    })
}

/// Number of substituent hydrogens that Rule 2 cannot tell apart
/// (no identified isotope, or explicitly protium).
fn protium_count(mol: &Molecule3D, atom: usize) -> usize {
    mol.get_atom_bonds(atom)
        .map(|bonds| {
            bonds
                .iter()
                .filter(|bond| bond.is_covalent())
                .filter(|bond| {
                    mol.get_atomic_number(bond.target()) == 1
                        && matches!(mol.get_isotope(bond.target()), None | Some(1))
                })
                .count()
        })
        .unwrap_or(0)
}

/// Trivalent elements whose lone pair does not invert at room temperature,
/// so a pyramidal arrangement is configurationally stable.
fn pyramidal_element(elem_no: u8) -> bool {
    matches!(elem_no, 15 | 16 | 33 | 34 | 51 | 52 | 83 | 84)
}

fn is_pyramidal(mol: &Molecule3D, atom: usize) -> bool {
    let Some(center) = mol.get_atom_position(atom) else {
        return false;
    };
    let Some(bonds) = mol.get_atom_bonds(atom) else {
        return false;
    };
    let positions: Vec<Vector> = bonds
        .iter()
        .filter(|bond| bond.is_covalent())
        .flat_map(|bond| mol.get_atom_position(bond.target()))
        .collect();
    if positions.len() != 3 {
        return false;
    }
    let normal = Vector::normal_through_points(&positions[0], &positions[1], &positions[2]);
    center.distance_to_plane(&positions[0], &normal).abs() >= TRIGONALITY_MIN
}

/// Structural pre-filter for tetrahedral-like centers: four substituents
/// always qualify, three only for the stably pyramidal heteroatoms, and two
/// indistinguishable hydrogens disqualify outright.
fn could_be_chiral_atom(mol: &Molecule3D, atom: usize) -> bool {
    let Some(bonds) = mol.get_atom_bonds(atom) else {
        return false;
    };
    match bonds.iter().filter(|bond| bond.is_covalent()).count() {
        4 => protium_count(mol, atom) <= 1,
        3 => {
            pyramidal_element(mol.get_atomic_number(atom))
                && protium_count(mol, atom) <= 1
                && is_pyramidal(mol, atom)
        }
        _ => false,
    }
}

/// What a single-center evaluation produced: the descriptor, when the rules
/// resolved one, and the number of distinct priority ranks among the root's
/// substituent slots (batch-wide maximum reported as diagnostic state by
/// [`assign_stereo_descriptors`]).
struct AtomOutcome {
    descriptor: Option<StereoDescriptor>,
    distinct_ranks: usize,
}

fn evaluate_atom_inner(
    mol: &Molecule3D,
    atom: usize,
    max_rule: Rule,
    aux_chain: &IntSet<usize>,
) -> Result<AtomOutcome, CipError> {
    let mut digraph = Digraph::build(mol, atom, None, aux_chain.clone(), None);
    let ranking = digraph.rank_root(max_rule);
    if !ranking.resolved {
        return Ok(AtomOutcome {
            descriptor: None,
            distinct_ranks: ranking.distinct_ranks,
        });
    }
    let descriptor = handedness(mol, atom, &digraph, &ranking.order)?;
    let descriptor = match (ranking.pseudo, descriptor) {
        (true, StereoDescriptor::R) => StereoDescriptor::PseudoR,
        (true, StereoDescriptor::S) => StereoDescriptor::PseudoS,
        (_, other) => other,
    };
    Ok(AtomOutcome {
        descriptor: Some(descriptor),
        distinct_ranks: ranking.distinct_ranks,
    })
}

enum EneOutcome {
    /// No surviving double bond, or an end that cannot hold a configuration.
    NotEne,
    /// An even cumulene; its stereogenicity is axial, not planar.
    Axial,
    /// An end whose two substituents could not be ranked.
    Indeterminate,
    /// A decided descriptor plus the two end atoms it belongs to.
    Assigned(StereoDescriptor, usize, usize),
}

/// Follows a chain of consecutive double bonds through sp carbons. Returns
/// the final end atom, its chain-side neighbor, and the number of double
/// bonds added along the way.
fn extend_cumulene(mol: &Molecule3D, mut prev: usize, mut end: usize) -> (usize, usize, usize) {
    let mut added = 0;
    while added <= mol.len() && mol.covalent_bond_count(end) == 2 {
        let next = mol.get_atom_bonds(end).and_then(|bonds| {
            bonds
                .iter()
                .filter(|bond| bond.is_covalent())
                .find(|bond| bond.target() != prev)
                .copied()
        });
        let Some(bond) = next else {
            break;
        };
        if bond.bond_order() != BondOrder::Double || effective_order(mol, end, &bond) != 2 {
            break;
        }
        prev = end;
        end = bond.target();
        added += 1;
    }
    (end, prev, added)
}

fn ene_end_eligible(mol: &Molecule3D, end: usize) -> bool {
    match mol.covalent_bond_count(end) {
        3 => true,
        // divalent nitrogen: the lone pair takes the second position
        2 => mol.get_atomic_number(end) == 7,
        _ => false,
    }
}

/// The higher-ranked substituent on one alkene end, found in a digraph
/// rooted at the end with the other end as parent. `None` when the two
/// substituents tie under the rules in play.
fn ene_end_winner(
    mol: &Molecule3D,
    end: usize,
    partner: usize,
    max_rule: Rule,
) -> Result<Option<usize>, CipError> {
    let mut digraph = Digraph::build(mol, end, Some(partner), IntSet::default(), None);
    let root = digraph.root;
    digraph.sort_children(root, max_rule);
    let eligible: Vec<usize> = digraph.nodes[root]
        .children
        .clone()
        .into_iter()
        .filter(|&child| {
            child != digraph.placeholder
                && !(digraph.nodes[child].is_duplicate
                    && digraph.nodes[child].atom == Some(partner))
        })
        .collect();
    let Some(&winner) = eligible.first() else {
        return Ok(None);
    };
    if let Some(&runner_up) = eligible.get(1) {
        if digraph.compare_pair(winner, runner_up, max_rule) == TIED {
            return Ok(None);
        }
    }
    Ok(digraph.nodes[winner].atom)
}

/// Locates and evaluates the planar stereogenic unit containing the double
/// bond between `atom1` and `atom2`, cumulene chains included.
fn evaluate_ene(
    mol: &Molecule3D,
    atom1: usize,
    atom2: usize,
    max_rule: Rule,
) -> Result<EneOutcome, CipError> {
    if !has_effective_double(mol, atom1, atom2) {
        return Ok(EneOutcome::NotEne);
    }
    let (end_a, prev_a, added_a) = extend_cumulene(mol, atom2, atom1);
    let (end_b, prev_b, added_b) = extend_cumulene(mol, atom1, atom2);
    if (1 + added_a + added_b) % 2 == 0 {
        return Ok(EneOutcome::Axial);
    }
    if !ene_end_eligible(mol, end_a) || !ene_end_eligible(mol, end_b) {
        return Ok(EneOutcome::NotEne);
    }
    let Some(winner_a) = ene_end_winner(mol, end_a, prev_a, max_rule)? else {
        return Ok(EneOutcome::Indeterminate);
    };
    let Some(winner_b) = ene_end_winner(mol, end_b, prev_b, max_rule)? else {
        return Ok(EneOutcome::Indeterminate);
    };
    let position = |atom: usize| {
        mol.get_atom_position(atom)
            .ok_or(CipError::MissingPosition(atom))
    };
    let top_a = position(winner_a)?;
    let top_b = position(winner_b)?;
    let plane_a = position(end_a)?;
    let plane_b = position(end_b)?;
    let normal_a = Vector::normal_through_points(&top_a, &plane_a, &plane_b);
    let normal_b = Vector::normal_through_points(&plane_a, &plane_b, &top_b);
    let alignment = normal_a.dot(&normal_b);
    if alignment.abs() < 1e-9 {
        return Err(CipError::DegenerateGeometry(end_a));
    }
    let descriptor = if alignment > 0.0 {
        StereoDescriptor::Z
    } else {
        StereoDescriptor::E
    };
    Ok(EneOutcome::Assigned(descriptor, end_a, end_b))
}

/// Structural (Rules 1-3) R/S for a single atom. Pre-filtered atoms and
/// centers those rules cannot resolve report [`StereoDescriptor::None`].
pub fn atom_stereo_descriptor(
    mol: &Molecule3D,
    atom: usize,
) -> Result<StereoDescriptor, CipError> {
    if atom >= mol.len() {
        return Err(CipError::AtomOutOfBounds(atom));
    }
    if !could_be_chiral_atom(mol, atom) {
        return Ok(StereoDescriptor::None);
    }
    Ok(evaluate_atom_inner(mol, atom, Rule::Rule3, &IntSet::default())?
        .descriptor
        .unwrap_or(StereoDescriptor::None))
}

/// Structural (Rules 1-3) E/Z for the double bond between the two atoms.
/// [`StereoDescriptor::None`] when the bond is not stereogenic.
pub fn bond_stereo_descriptor(
    mol: &Molecule3D,
    atom1: usize,
    atom2: usize,
) -> Result<StereoDescriptor, CipError> {
    if atom1 >= mol.len() {
        return Err(CipError::AtomOutOfBounds(atom1));
    }
    if atom2 >= mol.len() {
        return Err(CipError::AtomOutOfBounds(atom2));
    }
    let bonded = mol
        .get_atom_bonds(atom1)
        .map(|bonds| {
            bonds
                .iter()
                .any(|bond| bond.target() == atom2 && bond.bond_order() == BondOrder::Double)
        })
        .unwrap_or(false);
    if !bonded {
        return Err(CipError::NotADoubleBond(atom1, atom2));
    }
    match evaluate_ene(mol, atom1, atom2, Rule::Rule3)? {
        EneOutcome::Assigned(descriptor, _, _) => Ok(descriptor),
        _ => Ok(StereoDescriptor::None),
    }
}

/// Batch assignment over a candidate atom set. Atoms that already carry a
/// descriptor are left untouched. Tetrahedral-like centers are tried with
/// the structural rules first, double bonds next, and whatever stays open
/// gets the full rule set including the Mata analysis. Failures of
/// individual centers are logged and marked
/// [`StereoDescriptor::Undetermined`]; the batch always completes.
pub fn assign_stereo_descriptors(mol: &mut Molecule3D, candidates: &[usize]) {
    let candidate_set: IntSet<usize> = candidates
        .iter()
        .copied()
        .filter(|&atom| atom < mol.len())
        .filter(|&atom| mol.stereo_descriptor(atom).is_none())
        .collect();
    let mut atom_candidates: Vec<usize> = candidate_set
        .iter()
        .copied()
        .filter(|&atom| could_be_chiral_atom(mol, atom))
        .collect();
    atom_candidates.sort_unstable();
    let mut bond_candidates: Vec<(usize, usize)> = Vec::new();
    for &atom in &candidate_set {
        let Some(bonds) = mol.get_atom_bonds(atom) else {
            continue;
        };
        for bond in bonds {
            let other = bond.target();
            if bond.bond_order() == BondOrder::Double
                && candidate_set.contains(&other)
                && effective_order(mol, atom, bond) == 2
            {
                bond_candidates.push((atom.min(other), atom.max(other)));
            }
        }
    }
    let bond_candidates: Vec<(usize, usize)> =
        bond_candidates.into_iter().sorted().dedup().collect();
    debug!(
        "cip: {} atom candidates, {} double-bond candidates",
        atom_candidates.len(),
        bond_candidates.len()
    );

    // Ring pre-scan, only needed when E/Z designations might be erased.
    let mut rings = RingSet::new();
    if !bond_candidates.is_empty() {
        let ends: IntSet<usize> = bond_candidates
            .iter()
            .flat_map(|&(atom1, atom2)| [atom1, atom2])
            .collect();
        for &end in &ends {
            Digraph::build(mol, end, None, IntSet::default(), Some(&mut rings));
        }
    }
    let mut max_distinct_ranks = 0;

    // Pass A: tetrahedral-like centers, structural rules only.
    let shallow: Vec<(usize, Result<AtomOutcome, CipError>)> = {
        let mol: &Molecule3D = &*mol;
        atom_candidates
            .par_iter()
            .map(|&atom| {
                (atom, evaluate_atom_inner(mol, atom, Rule::Rule3, &IntSet::default()))
            })
            .collect()
    };
    let mut unresolved: Vec<usize> = Vec::new();
    for (atom, result) in shallow {
        match result {
            Ok(outcome) => {
                max_distinct_ranks = max_distinct_ranks.max(outcome.distinct_ranks);
                match outcome.descriptor {
                    Some(descriptor) => mol.set_stereo_descriptor(atom, descriptor),
                    None => unresolved.push(atom),
                }
            }
            Err(error) => {
                warn!("cip: atom {atom}: {error}");
                mol.set_stereo_descriptor(atom, StereoDescriptor::Undetermined);
            }
        }
    }

    // Pass B: double bonds, both ends recorded for the ring cleanup.
    let ene_results: Vec<((usize, usize), Result<EneOutcome, CipError>)> = {
        let mol: &Molecule3D = &*mol;
        bond_candidates
            .par_iter()
            .map(|&(atom1, atom2)| {
                ((atom1, atom2), evaluate_ene(mol, atom1, atom2, Rule::Rule3))
            })
            .collect()
    };
    let mut assigned_enes: Vec<(usize, usize)> = Vec::new();
    for ((atom1, atom2), result) in ene_results {
        match result {
            Ok(EneOutcome::Assigned(descriptor, end1, end2)) => {
                mol.set_stereo_descriptor(end1, descriptor);
                mol.set_stereo_descriptor(end2, descriptor);
                assigned_enes.push((end1, end2));
            }
            Ok(_) => {}
            Err(error) => {
                warn!("cip: bond {atom1}={atom2}: {error}");
                mol.set_stereo_descriptor(atom1, StereoDescriptor::Undetermined);
                mol.set_stereo_descriptor(atom2, StereoDescriptor::Undetermined);
            }
        }
    }

    // Pass C: the full rule set for what Rules 1-3 left open.
    let deep: Vec<(usize, Result<AtomOutcome, CipError>)> = {
        let mol: &Molecule3D = &*mol;
        unresolved
            .par_iter()
            .map(|&atom| {
                (atom, evaluate_atom_inner(mol, atom, Rule::Rule5, &IntSet::default()))
            })
            .collect()
    };
    for (atom, result) in deep {
        match result {
            Ok(outcome) => {
                max_distinct_ranks = max_distinct_ranks.max(outcome.distinct_ranks);
                if let Some(descriptor) = outcome.descriptor {
                    mol.set_stereo_descriptor(atom, descriptor);
                }
            }
            Err(error) => {
                warn!("cip: atom {atom}: {error}");
                mol.set_stereo_descriptor(atom, StereoDescriptor::Undetermined);
            }
        }
    }
    debug!("cip: max distinct priority ranks {max_distinct_ranks}");

    // No E/Z designation inside a small ring.
    for (end1, end2) in assigned_enes {
        if rings.contains_bond(end1, end2) {
            mol.set_stereo_descriptor(end1, StereoDescriptor::None);
            mol.set_stereo_descriptor(end2, StereoDescriptor::None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::BondOrder;

    fn atom_at(elem_no: u8, position: (f64, f64, f64)) -> Atom {
        Atom::new(elem_no).with_position(position)
    }

    fn molecule(atoms: Vec<Atom>, bonds: &[(usize, usize)]) -> Molecule3D {
        let mut molecule = Molecule3D::from_atoms(atoms);
        for &(atom1, atom2) in bonds {
            molecule.add_bond(atom1, atom2, BondOrder::Single);
        }
        molecule
    }

    // Tetrahedron vertices; substituents placed on them in decreasing
    // priority give an R center, swapping any two gives S.
    const Q1: (f64, f64, f64) = (1.0, 1.0, 1.0);
    const Q2: (f64, f64, f64) = (-1.0, 1.0, -1.0);
    const Q3: (f64, f64, f64) = (1.0, -1.0, -1.0);
    const Q4: (f64, f64, f64) = (-1.0, -1.0, 1.0);

    fn halomethane(second: Atom, third: Atom) -> Molecule3D {
        molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(35, Q1),
                second,
                third,
                atom_at(1, Q4),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4)],
        )
    }

    #[test]
    fn bromochlorofluoromethane_r_and_s() {
        let r = halomethane(atom_at(17, Q2), atom_at(9, Q3));
        assert_eq!(atom_stereo_descriptor(&r, 0), Ok(StereoDescriptor::R));

        let s = halomethane(atom_at(17, Q3), atom_at(9, Q2));
        assert_eq!(atom_stereo_descriptor(&s, 0), Ok(StereoDescriptor::S));
    }

    #[test]
    fn deuterium_decides_by_mass() {
        // Br, Cl, D, H: only Rule 2 separates the two hydrogens.
        let mol = halomethane(atom_at(17, Q2), atom_at(1, Q3).with_isotope(2));
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::R));
    }

    #[test]
    fn monoisotopic_label_is_not_stereogenic() {
        // fluorine has a single natural isotope, so F and 19F are the same
        // substituent and the center stays unresolved
        let mol = halomethane(atom_at(9, Q2), atom_at(9, Q3).with_isotope(19));
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::None));
    }

    #[test]
    fn chlorine_isotope_still_decides_by_mass() {
        // 37Cl outweighs the standard-weight chlorine
        let mol = halomethane(atom_at(17, Q2), atom_at(17, Q3).with_isotope(37));
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::S));
    }

    fn vinyl_against_isopropyl() -> Molecule3D {
        let mut mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(17, Q1),
                atom_at(9, Q2),
                atom_at(6, Q3),
                atom_at(6, (2.0, -2.0, -1.0)),
                atom_at(6, (2.0, -1.0, -2.0)),
                atom_at(6, Q4),
                atom_at(6, (-2.0, -2.0, 2.0)),
            ],
            &[(0, 1), (0, 2), (0, 3), (3, 4), (3, 5), (0, 6)],
        );
        mol.add_bond(6, 7, BondOrder::Double);
        mol
    }

    #[test]
    fn duplicate_ranks_below_real_twin() {
        // hydrogen-suppressed: the isopropyl branch carries two real
        // carbons where the vinyl branch carries one real and one phantom,
        // so isopropyl outranks vinyl
        let mol = vinyl_against_isopropyl();
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::R));
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let mol = vinyl_against_isopropyl();
        let mut digraph = Digraph::build(&mol, 0, None, IntSet::default(), None);
        let children = digraph.nodes[digraph.root].children.clone();
        for &a in &children {
            for &b in &children {
                let forward = digraph.compare_pair(a, b, Rule::Rule5);
                let backward = digraph.compare_pair(b, a, Rule::Rule5);
                assert_eq!(forward, -backward);
            }
        }
    }

    #[test]
    fn butan_2_ol_is_r() {
        let mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(8, Q1),
                atom_at(6, Q3),
                atom_at(6, Q2),
                atom_at(6, (-2.0, 2.0, -2.0)),
                atom_at(1, Q4),
            ],
            &[(0, 1), (0, 2), (0, 3), (3, 4), (0, 5)],
        );
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::R));
    }

    #[test]
    fn propan_2_ol_has_no_center() {
        let mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(8, Q1),
                atom_at(6, Q2),
                atom_at(6, Q3),
                atom_at(1, Q4),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4)],
        );
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::None));
    }

    #[test]
    fn two_plain_hydrogens_disqualify() {
        let mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(8, Q1),
                atom_at(6, Q2),
                atom_at(1, Q3),
                atom_at(1, Q4),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4)],
        );
        assert!(!could_be_chiral_atom(&mol, 0));
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::None));
    }

    fn butane_2_3_diol(o3: (f64, f64, f64), c4: (f64, f64, f64)) -> Molecule3D {
        molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(8, Q1),
                atom_at(6, Q3),
                atom_at(1, Q4),
                atom_at(6, Q2),
                atom_at(8, o3),
                atom_at(6, c4),
                atom_at(1, (0.0, 2.0, -2.0)),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4), (4, 5), (4, 6), (4, 7)],
        )
    }

    #[test]
    fn butanediol_rr() {
        let mut mol = butane_2_3_diol((-2.0, 2.0, 0.0), (-2.0, 0.0, -2.0));
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::R);
        assert_eq!(mol.stereo_descriptor(4), StereoDescriptor::R);
    }

    #[test]
    fn butanediol_meso() {
        let mut mol = butane_2_3_diol((-2.0, 0.0, -2.0), (-2.0, 2.0, 0.0));
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::R);
        assert_eq!(mol.stereo_descriptor(4), StereoDescriptor::S);
    }

    #[test]
    fn assignment_is_idempotent() {
        let mut mol = butane_2_3_diol((-2.0, 0.0, -2.0), (-2.0, 2.0, 0.0));
        mol.assign_stereo_descriptors();
        let first = mol.stereo_descriptors().to_vec();
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptors(), first.as_slice());
    }

    #[test]
    fn candidate_set_restricts_assignment() {
        let mut mol = butane_2_3_diol((-2.0, 2.0, 0.0), (-2.0, 0.0, -2.0));
        mol.assign_stereo_descriptors_for(&[0]);
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::R);
        assert_eq!(mol.stereo_descriptor(4), StereoDescriptor::None);
    }

    #[test]
    fn pyramidal_phosphine_uses_lone_pair() {
        let mol = molecule(
            vec![
                atom_at(15, (0.0, 0.0, 0.0)),
                atom_at(17, Q1),
                atom_at(9, Q2),
                atom_at(6, Q3),
            ],
            &[(0, 1), (0, 2), (0, 3)],
        );
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::R));
    }

    #[test]
    fn planar_phosphorus_is_not_a_candidate() {
        let mol = molecule(
            vec![
                atom_at(15, (0.0, 0.0, 0.0)),
                atom_at(17, (1.0, 0.0, 0.0)),
                atom_at(9, (-0.5, 0.866, 0.0)),
                atom_at(6, (-0.5, -0.866, 0.0)),
            ],
            &[(0, 1), (0, 2), (0, 3)],
        );
        assert!(!could_be_chiral_atom(&mol, 0));
    }

    fn but_2_ene(c4_y: f64) -> Molecule3D {
        let mut mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(6, (1.33, 0.0, 0.0)),
                atom_at(6, (-0.7, 1.2, 0.0)),
                atom_at(6, (2.03, c4_y, 0.0)),
                atom_at(1, (-0.7, -1.2, 0.0)),
                atom_at(1, (2.03, -c4_y, 0.0)),
            ],
            &[(0, 2), (0, 4), (1, 3), (1, 5)],
        );
        mol.add_bond(0, 1, BondOrder::Double);
        mol
    }

    #[test]
    fn trans_2_butene_is_e() {
        let mut mol = but_2_ene(-1.2);
        assert_eq!(bond_stereo_descriptor(&mol, 0, 1), Ok(StereoDescriptor::E));
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::E);
        assert_eq!(mol.stereo_descriptor(1), StereoDescriptor::E);
    }

    #[test]
    fn cis_2_butene_is_z() {
        let mut mol = but_2_ene(1.2);
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::Z);
        assert_eq!(mol.stereo_descriptor(1), StereoDescriptor::Z);
    }

    #[test]
    fn terminal_alkene_end_is_indeterminate() {
        // propene: the =CH2 end carries two plain hydrogens
        let mut mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(6, (1.33, 0.0, 0.0)),
                atom_at(6, (-0.7, 1.2, 0.0)),
                atom_at(1, (-0.7, -1.2, 0.0)),
                atom_at(1, (2.03, 1.2, 0.0)),
                atom_at(1, (2.03, -1.2, 0.0)),
            ],
            &[(0, 2), (0, 3), (1, 4), (1, 5)],
        );
        mol.add_bond(0, 1, BondOrder::Double);
        assert_eq!(bond_stereo_descriptor(&mol, 0, 1), Ok(StereoDescriptor::None));
    }

    #[test]
    fn small_ring_double_bond_keeps_no_designation() {
        let mut mol = molecule(
            vec![
                atom_at(6, (0.0, 1.0, 0.0)),
                atom_at(6, (0.95, 0.31, 0.0)),
                atom_at(6, (0.59, -0.81, 0.0)),
                atom_at(6, (-0.59, -0.81, 0.0)),
                atom_at(6, (-0.95, 0.31, 0.0)),
                atom_at(1, (0.0, 2.0, 0.0)),
                atom_at(1, (1.9, 0.62, 0.0)),
            ],
            &[(1, 2), (2, 3), (3, 4), (4, 0), (0, 5), (1, 6)],
        );
        mol.add_bond(0, 1, BondOrder::Double);
        // the bond on its own is geometrically cis
        assert_eq!(bond_stereo_descriptor(&mol, 0, 1), Ok(StereoDescriptor::Z));
        // the batch pass erases it again: the ring has only five members
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::None);
        assert_eq!(mol.stereo_descriptor(1), StereoDescriptor::None);
    }

    #[test]
    fn aldoxime_is_e() {
        let mut mol = molecule(
            vec![
                atom_at(6, (-0.7, 1.2, 0.0)),
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(1, (-0.7, -1.2, 0.0)),
                atom_at(7, (1.28, 0.0, 0.0)),
                atom_at(8, (2.0, -1.2, 0.0)),
            ],
            &[(0, 1), (1, 2), (3, 4)],
        );
        mol.add_bond(1, 3, BondOrder::Double);
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(1), StereoDescriptor::E);
        assert_eq!(mol.stereo_descriptor(3), StereoDescriptor::E);
    }

    #[test]
    fn allene_gets_no_planar_designation() {
        let mut mol = molecule(
            vec![
                atom_at(6, (-1.33, 0.0, 0.0)),
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(6, (1.33, 0.0, 0.0)),
                atom_at(6, (-2.03, 1.2, 0.0)),
                atom_at(1, (-2.03, -1.2, 0.0)),
                atom_at(6, (2.03, 0.0, 1.2)),
                atom_at(1, (2.03, 0.0, -1.2)),
            ],
            &[(0, 3), (0, 4), (2, 5), (2, 6)],
        );
        mol.add_bond(0, 1, BondOrder::Double);
        mol.add_bond(1, 2, BondOrder::Double);
        assert_eq!(bond_stereo_descriptor(&mol, 0, 1), Ok(StereoDescriptor::None));
        mol.assign_stereo_descriptors();
        assert!(mol.stereo_descriptors().iter().all(|d| d.is_none()));
    }

    fn pentane_2_3_4_triol(o4: (f64, f64, f64), c5: (f64, f64, f64)) -> Molecule3D {
        molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(8, Q1),
                atom_at(6, Q2),
                atom_at(6, Q3),
                atom_at(1, Q4),
                atom_at(8, (-2.0, 2.0, 0.0)),
                atom_at(6, (-2.0, 0.0, -2.0)),
                atom_at(1, (0.0, 2.0, -2.0)),
                atom_at(8, o4),
                atom_at(6, c5),
                atom_at(1, (0.0, -2.0, -2.0)),
            ],
            &[
                (0, 1),
                (0, 2),
                (0, 3),
                (0, 4),
                (2, 5),
                (2, 6),
                (2, 7),
                (3, 8),
                (3, 9),
                (3, 10),
            ],
        )
    }

    #[test]
    fn pseudo_asymmetric_center_is_lowercase() {
        // (2R,4S)-pentane-2,3,4-triol: C3 separates enantiomorphic branches
        // and only Rule 5 can rank them.
        let mut mol = pentane_2_3_4_triol((2.0, 0.0, -2.0), (2.0, -2.0, 0.0));
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(2), StereoDescriptor::R);
        assert_eq!(mol.stereo_descriptor(3), StereoDescriptor::S);
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::PseudoR);
        assert!(mol.stereo_descriptor(0).is_pseudo());
    }

    #[test]
    fn homochiral_branches_leave_no_center() {
        // (2R,4R)-pentane-2,3,4-triol: the C3 branches stay tied through
        // every rule, so C3 gets nothing.
        let mut mol = pentane_2_3_4_triol((2.0, -2.0, 0.0), (2.0, 0.0, -2.0));
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(2), StereoDescriptor::R);
        assert_eq!(mol.stereo_descriptor(3), StereoDescriptor::R);
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::None);
    }

    #[test]
    fn errors_are_reported() {
        let mol = molecule(
            vec![atom_at(6, (0.0, 0.0, 0.0)), atom_at(6, (1.5, 0.0, 0.0))],
            &[(0, 1)],
        );
        assert_eq!(
            bond_stereo_descriptor(&mol, 0, 1),
            Err(CipError::NotADoubleBond(0, 1))
        );
        assert_eq!(
            atom_stereo_descriptor(&mol, 9),
            Err(CipError::AtomOutOfBounds(9))
        );
        assert_eq!(
            CipError::MissingPosition(3).to_string(),
            "atom 3 has no 3D position"
        );
    }

    #[test]
    fn ring_scan_registers_small_rings() {
        let mol = molecule(
            vec![
                atom_at(6, (0.0, 1.0, 0.0)),
                atom_at(6, (0.95, 0.31, 0.0)),
                atom_at(6, (0.59, -0.81, 0.0)),
                atom_at(6, (-0.59, -0.81, 0.0)),
                atom_at(6, (-0.95, 0.31, 0.0)),
            ],
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)],
        );
        let mut rings = RingSet::new();
        Digraph::build(&mol, 0, None, IntSet::default(), Some(&mut rings));
        assert_eq!(rings.len(), 1);
        assert!(rings.contains_bond(2, 3));
    }

    #[test]
    fn ring_closure_distance_is_per_branch() {
        // two root substituents reach atom 3 at different depths, and a ring
        // hanging off atom 3 closes back onto it; each branch's closure
        // duplicate must carry that branch's own first-occurrence sphere
        let mol = molecule(
            vec![Atom::new(6); 7],
            &[(0, 1), (0, 2), (1, 3), (2, 4), (4, 3), (3, 5), (5, 6), (6, 3)],
        );
        let digraph = Digraph::build(&mol, 0, None, IntSet::default(), None);
        let closures: Vec<(usize, usize)> = digraph
            .nodes
            .iter()
            .filter(|node| node.is_duplicate && node.atom == Some(3))
            .map(|node| (node.sphere, node.root_distance))
            .collect();
        assert!(closures.contains(&(5, 2)));
        assert!(closures.contains(&(6, 3)));
    }

    #[test]
    fn existing_descriptor_is_kept() {
        let mut mol = halomethane(atom_at(17, Q2), atom_at(9, Q3));
        mol.set_stereo_descriptor(0, StereoDescriptor::S);
        mol.assign_stereo_descriptors();
        assert_eq!(mol.stereo_descriptor(0), StereoDescriptor::S);
    }

    #[test]
    fn coplanar_center_resolves_to_s() {
        // a degenerate flat arrangement sits on the dividing plane itself
        let mol = molecule(
            vec![
                atom_at(6, (0.0, 0.0, 0.0)),
                atom_at(35, (1.0, 0.0, 0.0)),
                atom_at(17, (-1.0, 0.0, 0.0)),
                atom_at(9, (0.0, 1.0, 0.0)),
                atom_at(1, (0.0, -1.0, 0.0)),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4)],
        );
        assert_eq!(atom_stereo_descriptor(&mol, 0), Ok(StereoDescriptor::S));
    }

    #[test]
    fn mata_reference_majority() {
        assert_eq!(reference_choices(&[(1, 'R'), (2, 'S')]), vec!['R']);
        assert_eq!(reference_choices(&[(1, 'S'), (1, 'S'), (1, 'R')]), vec!['S']);
        assert_eq!(reference_choices(&[(1, 'R'), (1, 'S')]), vec!['R', 'S']);
        // placeholders never anchor the reference sphere
        assert_eq!(reference_choices(&[(1, '~'), (2, 'R')]), vec!['R']);
        assert!(reference_choices(&[(1, '~'), (2, '~')]).is_empty());
        assert!(reference_choices(&[]).is_empty());
    }

    #[test]
    fn like_precedes_unlike() {
        let pattern_a = like_unlike(&[(1, 'R'), (2, 'R')], 'R');
        let pattern_b = like_unlike(&[(1, 'R'), (2, 'S')], 'R');
        assert_eq!(first_divergence(&pattern_a, &pattern_b), Some((1, A_WINS)));
        assert_eq!(first_divergence(&pattern_a, &pattern_a), None);
    }

    #[test]
    fn absent_descriptors_align_in_lists() {
        // a '~' entry keeps the positions of deeper descriptors comparable
        let pattern_a = like_unlike(&[(1, 'R'), (2, '~'), (3, 'R')], 'R');
        let pattern_b = like_unlike(&[(1, 'R'), (2, '~'), (3, 'S')], 'R');
        assert_eq!(first_divergence(&pattern_a, &pattern_b), Some((2, A_WINS)));
        let pattern_c = like_unlike(&[(1, 'R'), (2, 'S')], 'R');
        let pattern_d = like_unlike(&[(1, 'R'), (2, '~')], 'R');
        assert_eq!(first_divergence(&pattern_c, &pattern_d), Some((1, A_WINS)));
    }

    #[test]
    fn lexical_fallback_orders_pseudo_descriptors() {
        assert_eq!(lexical_divergence(&[(1, 'r')], &[(1, 's')]), A_WINS);
        assert_eq!(lexical_divergence(&[(1, 's')], &[(1, '~')]), A_WINS);
        assert_eq!(lexical_divergence(&[(1, '~')], &[(1, 'r')]), B_WINS);
        // enantiomeric branches stay tied here; Rule 5 separates them
        assert_eq!(lexical_divergence(&[(1, 'R')], &[(1, 'S')]), TIED);
    }
}
