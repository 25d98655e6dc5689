use crate::config::EconomyConfig;
use crate::fixed::Fixed;
use crate::observer::GameEvent;
use crate::state::{ProvinceId, ProvinceState, Tag, WorldState};
use crate::systems::Accumulator;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::instrument;

/// Daily income and manpower accrual.
#[derive(Debug, Clone, Default)]
pub struct EconomySystem {
    accumulator: Accumulator,
}

impl EconomySystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of passes run.
    #[instrument(skip_all, name = "economy")]
    pub fn update(
        &mut self,
        delta: Fixed,
        world: &mut WorldState,
        config: &EconomyConfig,
        events: &mut Vec<GameEvent>,
    ) -> u32 {
        let passes = self.accumulator.advance(delta, config.interval_hours);
        for _ in 0..passes {
            let total = run_income_tick(world, config);
            run_manpower_tick(world, config);
            events.push(GameEvent::IncomeCollected { total });
        }
        passes
    }

    pub fn pending(&self) -> Fixed {
        self.accumulator.pending()
    }
}

/// Income one province yields per pass.
///
/// Formula: development × income per development × terrain modifier, plus a
/// flat bonus on the coast.
pub fn province_income(province: &ProvinceState, config: &EconomyConfig) -> Fixed {
    let base = config
        .income_per_development
        .mul_int(province.development as i64)
        .mul(province.terrain.income_modifier());
    if province.coastal {
        base + config.coastal_bonus
    } else {
        base
    }
}

/// Credits every country with the income of its owned provinces.
///
/// Returns the total paid out.
#[instrument(skip_all, name = "income")]
pub fn run_income_tick(world: &mut WorldState, config: &EconomyConfig) -> Fixed {
    // PHASE 1: Extract owned provinces
    let provinces = &world.provinces;
    let inputs: Vec<(Tag, ProvinceId, &ProvinceState)> = world
        .countries
        .values()
        .flat_map(|c| {
            c.provinces
                .iter()
                .filter_map(move |id| provinces.get(id).map(|p| (c.tag.clone(), *id, p)))
        })
        .collect();

    // PHASE 2: Per-province income in parallel (collect keeps input order)
    let incomes: Vec<(Tag, Fixed)> = {
        let _span = tracing::info_span!("provinces_parallel", count = inputs.len()).entered();
        inputs
            .into_par_iter()
            .map(|(owner, id, province)| {
                let income = province_income(province, config);
                log::trace!("Province {} yields {} for {}", id, income, owner);
                (owner, income)
            })
            .collect()
    };

    // PHASE 3: Aggregate sequentially
    let mut deltas: BTreeMap<Tag, Fixed> = BTreeMap::new();
    for (owner, income) in incomes {
        *deltas.entry(owner).or_insert(Fixed::ZERO) += income;
    }

    let mut total = Fixed::ZERO;
    for (tag, income) in deltas {
        if let Some(country) = world.country_mut(&tag) {
            country.add_money(income);
            total += income;
        }
    }
    total
}

/// Grows national manpower and refills provincial pools.
///
/// Each owned province adds `population / divisor` to its owner's manpower
/// and to its own pool, which is capped at the recruitable share of the
/// population.
#[instrument(skip_all, name = "manpower")]
pub fn run_manpower_tick(world: &mut WorldState, config: &EconomyConfig) {
    let divisor = config.manpower_population_divisor.max(1);

    let owned: Vec<(Tag, ProvinceId)> = world
        .countries
        .values()
        .flat_map(|c| c.provinces.iter().map(move |id| (c.tag.clone(), *id)))
        .collect();

    for (tag, id) in owned {
        let Some(province) = world.province_mut(id) else {
            continue;
        };
        let growth = province.population / divisor;
        let cap = province.recruitable_manpower();
        province.manpower_pool = province.manpower_pool.saturating_add(growth).min(cap);

        if let Some(country) = world.country_mut(&tag) {
            country.add_manpower(growth as u64);
        }
    }
}
