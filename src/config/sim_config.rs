use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::network::{check_max_cost, CostMatrix, LinkChange, DEFAULT_MAX_EVENTS};
use crate::protocol::{AgentConfig, LoopPolicy, DEFAULT_MAX_COST};
use crate::{Cost, INFINITY};

/// Scenario file: topology, scripted link changes and agent settings.
///
/// In `costs` and in link changes, `null` means "no link".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub costs: Vec<Vec<Option<Cost>>>,
    #[serde(default)]
    pub link_changes: Vec<LinkChange>,
    #[serde(default)]
    pub policy: LoopPolicy,
    #[serde(default = "default_max_cost")]
    pub max_cost: Cost,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

fn default_max_cost() -> Cost {
    DEFAULT_MAX_COST
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

impl SimulationConfig {
    pub fn new(costs: Vec<Vec<Option<Cost>>>) -> Self {
        Self {
            costs,
            link_changes: Vec::new(),
            policy: LoopPolicy::default(),
            max_cost: DEFAULT_MAX_COST,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    /// Three nodes, `0-1` and `1-2` at cost 1, `0-2` at cost 4; once the
    /// network is quiet, `0-1` rises to 10.
    pub fn demo() -> Self {
        let mut config = Self::new(vec![
            vec![Some(0), Some(1), Some(4)],
            vec![Some(1), Some(0), Some(1)],
            vec![Some(4), Some(1), Some(0)],
        ]);
        config.link_changes.push(LinkChange {
            after: usize::MAX,
            a: 0,
            b: 1,
            cost: Some(10),
        });
        config
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: SimulationConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.costs.len()
    }

    pub fn topology(&self) -> anyhow::Result<CostMatrix> {
        let rows = self
            .costs
            .iter()
            .map(|row| row.iter().map(|cost| cost.unwrap_or(INFINITY)).collect())
            .collect();
        Ok(CostMatrix::from_rows(rows)?)
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            policy: self.policy,
            max_cost: self.max_cost,
        }
    }

    /// Checks the topology and every scripted change, applied in order, against
    /// the cutoff of the configured policy.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut topology = self.topology()?;
        if self.max_cost == 0 {
            bail!("max_cost must be positive");
        }
        if self.max_events == 0 {
            bail!("max_events must be positive");
        }
        let agent_config = self.agent_config();
        check_max_cost(&topology, &agent_config).context("initial topology")?;

        let size = self.size();
        let mut changes: Vec<(usize, &LinkChange)> = self.link_changes.iter().enumerate().collect();
        changes.sort_by_key(|(_, change)| change.after);
        for (index, change) in changes {
            if change.a >= size || change.b >= size {
                bail!("link change #{} names a node outside 0..{}", index, size);
            }
            if change.a == change.b {
                bail!("link change #{} connects node {} to itself", index, change.a);
            }
            topology.set_link(change.a, change.b, change.cost());
            check_max_cost(&topology, &agent_config)
                .with_context(|| format!("after link change #{}", index))?;
        }
        Ok(())
    }
}
