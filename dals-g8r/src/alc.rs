// SPDX-License-Identifier: Apache-2.0

//! Approximate local change: make every consumer of a `target` node read a
//! topologically earlier `substitute` instead (optionally through a new
//! inverter), and undo that exactly.

use anyhow::{Result, anyhow};

use crate::aig::edit::{add_inverter, fanins_of, remove_last_gate, rewire_fanout, set_fanins};
use crate::aig::fanout::{Fanout, fanouts_of};
use crate::aig::gate::{AigOperand, AigRef, GateFn};
use crate::aig::topo::TopoRanks;

/// A consumer of the target together with its full ordered fanin list at
/// capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFanout {
    pub fanout: Fanout,
    pub fanins: Vec<AigOperand>,
}

#[derive(Debug, Clone)]
pub struct Alc {
    target: AigRef,
    substitute: AigRef,
    complemented: bool,
    error: f64,
    captured: Vec<CapturedFanout>,
    applied: bool,
    /// Inverter created by the last `apply` of a complemented change.
    inverter: Option<AigRef>,
}

fn capture(g: &GateFn, target: AigRef) -> Result<Vec<CapturedFanout>> {
    fanouts_of(g, target)
        .into_iter()
        .map(|fanout| {
            let fanins = fanins_of(g, fanout).map_err(anyhow::Error::msg)?;
            Ok(CapturedFanout { fanout, fanins })
        })
        .collect()
}

impl Alc {
    /// Snapshots the target's current fanouts and their fanin lists.
    ///
    /// `error` is the estimated or measured error of the change; pass `1.0`
    /// when unknown.
    pub fn new(
        g: &GateFn,
        ranks: &TopoRanks,
        target: AigRef,
        substitute: AigRef,
        complemented: bool,
        error: f64,
    ) -> Result<Self> {
        if target.id >= g.gates.len() || substitute.id >= g.gates.len() {
            return Err(anyhow!(
                "ALC %{} -> %{} references a node outside the circuit",
                target.id,
                substitute.id
            ));
        }
        if !ranks.precedes(substitute, target) {
            return Err(anyhow!(
                "substitute {} is not topologically before target {}",
                g.node_name(substitute),
                g.node_name(target)
            ));
        }
        Ok(Alc {
            target,
            substitute,
            complemented,
            error,
            captured: capture(g, target)?,
            applied: false,
            inverter: None,
        })
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn set_error(&mut self, error: f64) {
        self.error = error;
    }

    pub fn target(&self) -> AigRef {
        self.target
    }

    pub fn substitute(&self) -> AigRef {
        self.substitute
    }

    pub fn is_complemented(&self) -> bool {
        self.complemented
    }

    pub fn captured_fanouts(&self) -> &[CapturedFanout] {
        &self.captured
    }

    pub fn inverter(&self) -> Option<AigRef> {
        self.inverter
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Rewires every consumer of the target to the substitute, or to a new
    /// inverter of it when complemented.
    ///
    /// The pre-state is re-captured here, so a change applied after other
    /// changes were committed sees the target's current consumers.
    pub fn apply(&mut self, g: &mut GateFn) -> Result<()> {
        if self.applied {
            return Err(anyhow!(
                "ALC on {} is already applied",
                g.node_name(self.target)
            ));
        }
        self.captured = capture(g, self.target)?;
        let replacement: AigOperand = if self.complemented {
            let inv = add_inverter(g, self.substitute.into());
            self.inverter = Some(inv);
            inv.into()
        } else {
            self.substitute.into()
        };
        for captured in &self.captured {
            rewire_fanout(g, captured.fanout, self.target, replacement)
                .map_err(anyhow::Error::msg)?;
        }
        self.applied = true;
        log::trace!(
            "applied {} -> {}{} ({} fanouts)",
            g.node_name(self.target),
            if self.complemented { "inv " } else { "" },
            g.node_name(self.substitute),
            self.captured.len()
        );
        Ok(())
    }

    /// Restores every captured fanin list in order and deletes the inverter.
    ///
    /// Only valid directly after `apply`, before any other structural edit.
    pub fn recover(&mut self, g: &mut GateFn) -> Result<()> {
        if !self.applied {
            return Err(anyhow!(
                "ALC on {} is not applied",
                g.node_name(self.target)
            ));
        }
        for captured in &self.captured {
            set_fanins(g, captured.fanout, &captured.fanins).map_err(anyhow::Error::msg)?;
        }
        if let Some(inv) = self.inverter.take() {
            remove_last_gate(g, inv).map_err(anyhow::Error::msg)?;
        }
        self.applied = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_simple_graph;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_rejects_later_substitute() {
        let t = setup_simple_graph();
        let ranks = TopoRanks::new(&t.g);
        assert!(Alc::new(&t.g, &ranks, t.a.node, t.o.node, false, 1.0).is_err());
        assert!(Alc::new(&t.g, &ranks, t.a.node, t.a.node, false, 1.0).is_err());
        let alc = Alc::new(&t.g, &ranks, t.o.node, t.a.node, false, 1.0).unwrap();
        assert_eq!(alc.error(), 1.0);
        assert_eq!(
            alc.captured_fanouts(),
            &[CapturedFanout {
                fanout: Fanout::OutputBit {
                    output_idx: 0,
                    bit_idx: 0
                },
                fanins: vec![t.o],
            }]
        );
    }

    #[test]
    fn test_apply_plain() {
        let t = setup_simple_graph();
        let mut g = t.g.clone();
        let ranks = TopoRanks::new(&g);
        let mut alc = Alc::new(&g, &ranks, t.a.node, t.i1.node, false, 0.5).unwrap();
        alc.apply(&mut g).unwrap();
        assert_eq!(g.fanins(t.o.node), vec![t.i1, t.b]);
        assert_eq!(g.gates.len(), t.g.gates.len());
        alc.recover(&mut g).unwrap();
        assert_eq!(g, t.g);
        assert!(alc.recover(&mut g).is_err());
    }

    #[test]
    fn test_apply_complemented_adds_inverter() {
        let t = setup_simple_graph();
        let mut g = t.g.clone();
        let ranks = TopoRanks::new(&g);
        let mut alc = Alc::new(&g, &ranks, t.c.node, t.i2.node, true, 0.5).unwrap();
        alc.apply(&mut g).unwrap();
        let inv = alc.inverter().unwrap();
        assert_eq!(inv.id, t.g.gates.len());
        assert_eq!(g.fanins(inv), vec![t.i2]);
        assert_eq!(g.outputs[1].bit_vector.get_lsb(0).node, inv);
        assert!(alc.apply(&mut g).is_err());
        alc.recover(&mut g).unwrap();
        assert_eq!(g, t.g);
        assert_eq!(alc.inverter(), None);
    }

    #[test]
    fn test_apply_recover_repeatable() {
        let t = setup_simple_graph();
        let mut g = t.g.clone();
        let ranks = TopoRanks::new(&g);
        let mut alc = Alc::new(&g, &ranks, t.b.node, t.i1.node, true, 0.5).unwrap();
        for _ in 0..3 {
            alc.apply(&mut g).unwrap();
            alc.recover(&mut g).unwrap();
            assert_eq!(g, t.g);
        }
    }
}
