// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # App
//!
//! The binary tabulates a reference contour object, cuts it into time slices in parallel,
//! checks the slices against the closed forms, gathers them over an in-process group of ranks
//! and writes them to an archive.
mod configuration;
pub mod reference;
mod telemetry;

pub(crate) use configuration::{Configuration, ContourConfiguration};

use crate::{ContourRead, LocalGroup, SliceArchive, TimeSlice, TimesliceExchange};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use nalgebra::DMatrix;
use num_complex::Complex64;
use reference::FreeLevels;
use std::{fmt, path::PathBuf};

/// Largest deviation of a computed density from the closed form before the run is rejected
const DENSITY_TOLERANCE: f64 = 1e-10;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct App {
    /// Configuration file, `.config/default.toml` when absent
    file_path: Option<PathBuf>,
    #[arg(value_enum, short, long, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    /// Write the archive here instead of the configured path
    #[arg(short, long)]
    archive: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevel {
    Trace,
    Info,
    Debug,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Error => "error",
        };
        write!(f, "{}", level)
    }
}

/// Run the binary end to end
pub fn run() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = App::parse();
    let config = Configuration::build(cli.file_path.as_deref())?;

    let (subscriber, _guard) =
        telemetry::get_subscriber(cli.log_level, &config.output.log_directory);
    telemetry::init_subscriber(subscriber)?;

    let levels = reference_levels(&config.contour)?;
    let reference = levels.build();
    let slices = reference.timeslices();
    tracing::info!(slices = slices.len(), "sliced the reference object");

    check_densities(&slices, &levels.occupations())?;

    let gathered = gather(&slices, config.exchange.ranks, config.exchange.root)?;
    if gathered != slices {
        return Err(eyre!(
            "gathering over {} ranks did not reproduce the slices",
            config.exchange.ranks
        ));
    }
    tracing::info!(ranks = config.exchange.ranks, "gathered the slices");

    let mut archive = SliceArchive::new();
    for slice in &gathered {
        slice.write_to_archive(&mut archive, &group_name(slice.tstp()));
    }
    let path = cli.archive.unwrap_or(config.output.archive);
    archive.save(&path)?;

    let loaded = SliceArchive::load(&path)?;
    for slice in &slices {
        let mut back = TimeSlice::default();
        back.read_from_archive(&loaded, &group_name(slice.tstp()))?;
        if &back != slice {
            return Err(eyre!(
                "the archive at {:?} does not reproduce tstp {}",
                path,
                slice.tstp()
            ));
        }
    }
    tracing::info!(path = ?path, groups = loaded.len(), "archive written");
    Ok(())
}

/// The reference levels described by the `contour` section
fn reference_levels(contour: &ContourConfiguration) -> color_eyre::Result<FreeLevels> {
    if contour.energies.is_empty() {
        return Err(eyre!("the contour configuration lists no level energies"));
    }
    Ok(FreeLevels {
        energies: contour.energies.clone(),
        beta: contour.beta,
        dt: contour.dt,
        nt: contour.nt,
        ntau: contour.ntau,
        statistics: contour.statistics,
    })
}

fn group_name(tstp: isize) -> String {
    format!("tstp{}", tstp)
}

/// Compare the density matrix of every slice with the equilibrium occupations
fn check_densities(slices: &[TimeSlice], occupations: &[f64]) -> color_eyre::Result<()> {
    let mut rho: DMatrix<Complex64> = DMatrix::zeros(0, 0);
    for slice in slices {
        slice.density_matrix_into(slice.tstp(), &mut rho);
        let deviation = occupations
            .iter()
            .enumerate()
            .map(|(k, &n)| (rho[(k, k)] - n).norm())
            .fold(0., f64::max);
        tracing::debug!(tstp = slice.tstp(), deviation, "density matrix");
        if deviation > DENSITY_TOLERANCE {
            return Err(eyre!(
                "density matrix at tstp {} deviates from the occupations by {:e}",
                slice.tstp(),
                deviation
            ));
        }
    }
    Ok(())
}

/// Distribute the slices round-robin over `ranks` ranks and sum them back onto `root`
fn gather(slices: &[TimeSlice], ranks: usize, root: usize) -> color_eyre::Result<Vec<TimeSlice>> {
    if root >= ranks {
        return Err(eyre!("root {} is outside a group of {} ranks", root, ranks));
    }
    let results = std::thread::scope(|scope| {
        let handles: Vec<_> = LocalGroup::new(ranks)
            .into_iter()
            .map(|comm| {
                scope.spawn(move || -> crate::Result<Vec<TimeSlice>> {
                    let exchange = TimesliceExchange::new(&comm);
                    let mut owned = Vec::with_capacity(slices.len());
                    for (n, slice) in slices.iter().enumerate() {
                        let mut slice = slice.clone();
                        if n % ranks != exchange.rank() {
                            slice.clear();
                        }
                        exchange.reduce(&mut slice, root)?;
                        owned.push(slice);
                    }
                    Ok(owned)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });

    let mut gathered = None;
    for (rank, result) in results.into_iter().enumerate() {
        let owned = result.map_err(|_| eyre!("rank {} panicked", rank))??;
        if rank == root {
            gathered = Some(owned);
        }
    }
    gathered.ok_or_else(|| eyre!("no rank returned the gathered slices"))
}
