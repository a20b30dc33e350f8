pub mod race_pars;
pub mod sim_opts;
