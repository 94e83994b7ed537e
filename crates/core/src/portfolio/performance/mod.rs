//! Performance engine: time- and money-weighted returns, risk metrics and
//! benchmark comparison over daily valuations.

mod benchmark;
mod irr_calculator;
mod performance_model;
mod performance_service;
mod returns_calculator;


pub use benchmark::benchmark_points;
pub use irr_calculator::{investor_flows, solve_irr, CashFlow, IrrSolution};
pub use performance_model::*;
pub use performance_service::{PerformanceRange, PerformanceService, PerformanceServiceTrait};
pub use returns_calculator::{
    annualize, calculate_annualized_return, calculate_max_drawdown, calculate_twr,
    calculate_volatility, cumulative_returns, daily_returns,
};
