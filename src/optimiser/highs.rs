//! Dispatch optimisation with the HiGHS solver.
//!
//! The problem minimises the total cost of generation, storage discharge and start-ups subject to
//! an energy balance at every bus and snapshot. Balance constraints are added before any other
//! rows so that their dual values can be read off as nodal prices.
use super::{ChunkSolution, Optimiser};
use crate::network::{Generator, Network, StorageUnit};
use ::highs::{HighsModelStatus, RowProblem as Problem, Sense};
use anyhow::{Result, bail, ensure};
use log::{Level, debug, log_enabled};
use std::ops::{Range, RangeBounds};

/// A decision variable in the optimisation.
///
/// `index` is the variable's column in the problem, used to look up its value in the solution.
#[derive(Clone, Copy)]
struct Variable {
    col: ::highs::Col,
    index: usize,
}

/// The problem under construction, along with the objective coefficients of its columns
struct ProblemBuilder {
    problem: Problem,
    costs: Vec<f64>,
}

impl ProblemBuilder {
    fn new() -> Self {
        Self {
            problem: Problem::default(),
            costs: Vec::new(),
        }
    }

    /// Add a continuous variable
    fn add_column<B: RangeBounds<f64>>(&mut self, cost: f64, bounds: B) -> Variable {
        let col = self.problem.add_column(cost, bounds);
        self.push(col, cost)
    }

    /// Add an integer variable
    fn add_integer_column<B: RangeBounds<f64>>(&mut self, cost: f64, bounds: B) -> Variable {
        let col = self.problem.add_integer_column(cost, bounds);
        self.push(col, cost)
    }

    fn push(&mut self, col: ::highs::Col, cost: f64) -> Variable {
        let index = self.costs.len();
        self.costs.push(cost);
        Variable { col, index }
    }

    /// Add a constraint row
    fn add_row<B: RangeBounds<f64>>(&mut self, bounds: B, terms: &[(Variable, f64)]) {
        self.problem.add_row(
            bounds,
            terms.iter().map(|(var, coeff)| (var.col, *coeff)),
        );
    }
}

/// Variables for unit commitment of a single generator
struct CommitmentVariables {
    /// Whether the generator is on
    status: Vec<Variable>,
    /// Whether the generator starts up
    start_up: Vec<Variable>,
}

/// Variables for a single storage unit
struct StorageVariables {
    charge: Vec<Variable>,
    discharge: Vec<Variable>,
    soc: Vec<Variable>,
}

/// All the variables of a chunk's problem, indexed by component then snapshot
struct ChunkVariables {
    generation: Vec<Vec<Variable>>,
    commitment: Vec<Option<CommitmentVariables>>,
    storage: Vec<StorageVariables>,
    flows: Vec<Vec<Variable>>,
}

/// Optimises dispatch using the HiGHS LP/MIP solver
#[derive(Debug, Default, Clone)]
pub struct HighsOptimiser {
    /// Maximum time to spend solving each chunk (seconds)
    pub time_limit: Option<f64>,
}

impl HighsOptimiser {
    /// Create a new [`HighsOptimiser`]
    pub fn new(time_limit: Option<f64>) -> Self {
        Self { time_limit }
    }
}

impl Optimiser for HighsOptimiser {
    fn optimise(
        &self,
        network: &Network,
        snapshots: Range<usize>,
        initial_soc: &[f64],
    ) -> Result<ChunkSolution> {
        ensure!(
            snapshots.end <= network.snapshots.len() && !snapshots.is_empty(),
            "Invalid snapshot range {snapshots:?}"
        );
        ensure!(
            initial_soc.len() == network.storage_units.len(),
            "Initial state of charge must be given for every storage unit"
        );

        let mut builder = ProblemBuilder::new();
        let variables = add_variables(&mut builder, network, &snapshots);
        add_balance_constraints(&mut builder, &variables, network, &snapshots);
        add_commitment_constraints(&mut builder, &variables, network, &snapshots);
        add_ramp_constraints(&mut builder, &variables, network);
        add_storage_constraints(&mut builder, &variables, network, initial_soc);

        let ProblemBuilder { problem, costs } = builder;
        let mut model = problem.optimise(Sense::Minimise);
        configure_highs_logging(&mut model);
        if let Some(time_limit) = self.time_limit {
            model.set_option("time_limit", time_limit);
        }

        let solved = model.solve();
        match solved.status() {
            HighsModelStatus::Optimal => {}
            status => bail!("Could not solve: {status:?}"),
        }

        let solution = solved.get_solution();
        let columns = solution.columns();
        let values =
            |vars: &[Variable]| -> Vec<f64> { vars.iter().map(|var| columns[var.index]).collect() };
        let objective: f64 = costs.iter().zip(columns).map(|(cost, value)| cost * value).sum();
        debug!(
            "Solved snapshots {}..{} with objective {objective}",
            snapshots.start, snapshots.end
        );

        let prices = if network.is_committable() {
            None
        } else {
            // The balance constraints are the first rows, ordered by bus then snapshot
            let duals = solution.dual_rows();
            Some(
                duals
                    .chunks(snapshots.len())
                    .take(network.buses.len())
                    .map(<[f64]>::to_vec)
                    .collect(),
            )
        };

        Ok(ChunkSolution {
            generator_dispatch: variables.generation.iter().map(|v| values(v)).collect(),
            storage_dispatch: variables
                .storage
                .iter()
                .map(|storage| {
                    storage
                        .discharge
                        .iter()
                        .zip(&storage.charge)
                        .map(|(d, c)| columns[d.index] - columns[c.index])
                        .collect()
                })
                .collect(),
            storage_soc: variables.storage.iter().map(|s| values(&s.soc)).collect(),
            link_flows: variables.flows.iter().map(|v| values(v)).collect(),
            prices,
            objective,
        })
    }
}

/// Enable logging for the HiGHS solver.
///
/// The solver writes straight to the console rather than through our logger, so its output is only
/// shown at debug level.
fn configure_highs_logging(model: &mut ::highs::Model) {
    let enabled = log_enabled!(Level::Debug);
    model.set_option("output_flag", enabled);
    model.set_option("log_to_console", enabled);
}

/// Add variables for every component and snapshot
fn add_variables(
    builder: &mut ProblemBuilder,
    network: &Network,
    snapshots: &Range<usize>,
) -> ChunkVariables {
    let generation = network
        .generators
        .iter()
        .map(|generator| {
            snapshots
                .clone()
                .map(|t| {
                    let max = generator.p_nom.value() * generator.p_max_pu[t].0;
                    builder.add_column(generator.marginal_cost[t].value(), 0.0..=max)
                })
                .collect()
        })
        .collect();

    let commitment = network
        .generators
        .iter()
        .map(|generator| {
            let parameters = generator.commitment.as_ref()?;
            let status = snapshots
                .clone()
                .map(|_| builder.add_integer_column(0.0, 0.0..=1.0))
                .collect();
            let start_up = snapshots
                .clone()
                .map(|_| builder.add_column(parameters.start_up_cost.value(), 0.0..=1.0))
                .collect();
            Some(CommitmentVariables { status, start_up })
        })
        .collect();

    let storage = network
        .storage_units
        .iter()
        .map(|storage| add_storage_variables(builder, storage, snapshots))
        .collect();

    let flows = network
        .links
        .iter()
        .map(|link| {
            let max = link.p_nom.value();
            snapshots
                .clone()
                .map(|_| builder.add_column(0.0, link.p_min_pu * max..=max))
                .collect()
        })
        .collect();

    ChunkVariables {
        generation,
        commitment,
        storage,
        flows,
    }
}

fn add_storage_variables(
    builder: &mut ProblemBuilder,
    storage: &StorageUnit,
    snapshots: &Range<usize>,
) -> StorageVariables {
    let power = |t: usize| storage.p_nom.value() * storage.p_max_pu[t].0;
    let energy = storage.energy_capacity();
    StorageVariables {
        charge: snapshots
            .clone()
            .map(|t| builder.add_column(0.0, 0.0..=power(t)))
            .collect(),
        discharge: snapshots
            .clone()
            .map(|t| builder.add_column(storage.marginal_cost.value(), 0.0..=power(t)))
            .collect(),
        soc: snapshots
            .clone()
            .map(|_| builder.add_column(0.0, 0.0..=energy))
            .collect(),
    }
}

/// Add the energy balance at each bus and snapshot.
///
/// These must be the first rows added to the problem.
fn add_balance_constraints(
    builder: &mut ProblemBuilder,
    variables: &ChunkVariables,
    network: &Network,
    snapshots: &Range<usize>,
) {
    assert!(
        builder.problem.num_rows() == 0,
        "Balance constraints must be added before other constraints"
    );

    for bus in network.buses.keys() {
        for (i, t) in snapshots.clone().enumerate() {
            let mut terms = Vec::new();
            for (generator, vars) in network.generators.iter().zip(&variables.generation) {
                if generator.bus == *bus {
                    terms.push((vars[i], 1.0));
                }
            }
            for (storage, vars) in network.storage_units.iter().zip(&variables.storage) {
                if storage.bus == *bus {
                    terms.push((vars.discharge[i], 1.0));
                    terms.push((vars.charge[i], -1.0));
                }
            }
            for (link, vars) in network.links.iter().zip(&variables.flows) {
                if link.bus0 == *bus {
                    terms.push((vars[i], -1.0));
                }
                if link.bus1 == *bus {
                    terms.push((vars[i], 1.0));
                }
            }

            let load: f64 = network
                .loads
                .iter()
                .filter(|load| load.bus == *bus)
                .map(|load| load.p_set[t].value())
                .sum();
            builder.add_row(load..=load, &terms);
        }
    }
}

/// Link output to on/off status, define start-ups and enforce minimum up times
fn add_commitment_constraints(
    builder: &mut ProblemBuilder,
    variables: &ChunkVariables,
    network: &Network,
    snapshots: &Range<usize>,
) {
    for ((generator, generation), commitment) in network
        .generators
        .iter()
        .zip(&variables.generation)
        .zip(&variables.commitment)
    {
        let (Some(parameters), Some(vars)) = (&generator.commitment, commitment) else {
            continue;
        };

        for (i, t) in snapshots.clone().enumerate() {
            let max = generator.p_nom.value() * generator.p_max_pu[t].0;
            builder.add_row(..=0.0, &[(generation[i], 1.0), (vars.status[i], -max)]);

            if i > 0 {
                builder.add_row(
                    0.0..,
                    &[
                        (vars.start_up[i], 1.0),
                        (vars.status[i], -1.0),
                        (vars.status[i - 1], 1.0),
                    ],
                );
            }

            let min_up = parameters.min_up_time as usize;
            for k in (i + 1)..(i + min_up).min(snapshots.len()) {
                builder.add_row(0.0.., &[(vars.status[k], 1.0), (vars.start_up[i], -1.0)]);
            }
        }
    }
}

/// Limit the hour-to-hour change in generator output
fn add_ramp_constraints(
    builder: &mut ProblemBuilder,
    variables: &ChunkVariables,
    network: &Network,
) {
    for (generator, vars) in network.generators.iter().zip(&variables.generation) {
        let Generator {
            ramp_limit_up,
            ramp_limit_down,
            p_nom,
            ..
        } = generator;

        for i in 1..vars.len() {
            if let Some(limit) = ramp_limit_up {
                let max = limit.0 * p_nom.value();
                builder.add_row(..=max, &[(vars[i], 1.0), (vars[i - 1], -1.0)]);
            }
            if let Some(limit) = ramp_limit_down {
                let max = limit.0 * p_nom.value();
                builder.add_row(..=max, &[(vars[i - 1], 1.0), (vars[i], -1.0)]);
            }
        }
    }
}

/// Track each storage unit's state of charge
fn add_storage_constraints(
    builder: &mut ProblemBuilder,
    variables: &ChunkVariables,
    network: &Network,
    initial_soc: &[f64],
) {
    for ((storage, vars), initial) in network
        .storage_units
        .iter()
        .zip(&variables.storage)
        .zip(initial_soc)
    {
        let initial = initial.clamp(0.0, storage.energy_capacity());
        for i in 0..vars.soc.len() {
            let mut terms = vec![
                (vars.soc[i], 1.0),
                (vars.charge[i], -storage.efficiency_store.0),
                (vars.discharge[i], 1.0 / storage.efficiency_dispatch.0),
            ];
            let rhs = if i == 0 {
                initial
            } else {
                terms.push((vars.soc[i - 1], -1.0));
                0.0
            };
            builder.add_row(rhs..=rhs, &terms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use crate::network::CommitmentParameters;
    use crate::units::{Capacity, Dimensionless, Money, MoneyPerEnergy};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_merit_order_dispatch(network: Network) {
        let n = network.snapshots.len();
        let solution = HighsOptimiser::default()
            .optimise(&network, 0..n, &[0.0])
            .unwrap();

        // Load in COAST is met first by the cheap solar and then by gas; NORTH is supplied
        // over the link by the gas unit
        let total_generation: f64 = solution
            .generator_dispatch
            .iter()
            .map(|dispatch| dispatch[0])
            .sum::<f64>()
            + solution.storage_dispatch[0][0];
        let total_load: f64 = network.loads.iter().map(|load| load.p_set[0].value()).sum();
        assert_approx_eq!(f64, total_generation, total_load, epsilon = 1e-6);

        let prices = solution.prices.unwrap();
        assert_eq!(prices.len(), network.buses.len());
        assert_eq!(prices[0].len(), n);
        assert!(solution.objective > 0.0);

        // Gas is marginal everywhere and the link is uncongested, so both buses price at the
        // gas unit's cost
        for bus_prices in &prices {
            for price in bus_prices {
                assert_approx_eq!(f64, *price, 30.0, epsilon = 1e-6);
            }
        }
    }

    #[rstest]
    fn test_infeasible(mut network: Network) {
        for load in &mut network.loads {
            for value in &mut load.p_set {
                *value = Capacity(1e6);
            }
        }
        let n = network.snapshots.len();
        let err = HighsOptimiser::default()
            .optimise(&network, 0..n, &[0.0])
            .unwrap_err();
        assert!(err.to_string().starts_with("Could not solve"));
    }

    #[rstest]
    fn test_committable_has_no_prices(mut network: Network) {
        network.generators[0].commitment = Some(CommitmentParameters {
            start_up_cost: Money(100.0),
            min_up_time: 2,
        });
        let solution = HighsOptimiser::default()
            .optimise(&network, 0..2, &[0.0])
            .unwrap();
        assert!(solution.prices.is_none());
        assert_eq!(solution.generator_dispatch[0].len(), 2);
    }

    #[rstest]
    fn test_unavailable_storage_is_idle(mut network: Network) {
        network.storage_units[0].p_max_pu = vec![Dimensionless(0.0); 3];
        network.generators[0].marginal_cost[1] = MoneyPerEnergy(500.0);
        let solution = HighsOptimiser::default()
            .optimise(&network, 0..3, &[5.0])
            .unwrap();
        for value in &solution.storage_dispatch[0] {
            assert_approx_eq!(f64, *value, 0.0, epsilon = 1e-9);
        }
    }

    #[rstest]
    fn test_storage_arbitrage(mut network: Network) {
        // Make gas expensive in the second hour so that storage charges then discharges
        network.generators[0].marginal_cost[1] = MoneyPerEnergy(500.0);
        let solution = HighsOptimiser::default()
            .optimise(&network, 0..2, &[5.0])
            .unwrap();
        let soc = &solution.storage_soc[0];
        assert_eq!(soc.len(), 2);
        assert!(soc.iter().all(|value| *value >= -1e-9));
        assert!(solution.storage_dispatch[0][1] > 0.0);
    }
}
