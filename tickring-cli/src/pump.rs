// tickring-cli/src/pump.rs

use std::thread;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::bounded;
use log::debug;

use tickring_common::{DoubleRingColumn, Generation, GetContext, KeyRange, TableUpdate, WraparoundChunkAccessor};

pub struct CycleStats {
    pub cycle: u64,
    pub appended: usize,
    pub previous_window: Option<KeyRange>,
    pub previous_sum: f64,
    pub update: TableUpdate,
}

pub struct PumpReport {
    pub cycles: Vec<CycleStats>,
    pub total_appended: usize,
    pub final_window: Option<KeyRange>,
}

/// Synthetic price ticks for one cycle.
fn tick_batch(cycle: u64, batch: usize) -> Vec<f64> {
    (0..batch)
        .map(|i| {
            let t = (cycle as usize * batch + i) as f64;
            100.0 + (t * 0.01).sin()
        })
        .collect()
}

/// Sums the whole window of a frozen generation, one chunk read.
fn sum_window(previous: WraparoundChunkAccessor<'_, f64>) -> Result<f64> {
    let Some(window) = previous.ring().indices() else {
        return Ok(0.0);
    };
    let mut context = GetContext::new(window.len());
    let chunk = previous.get_chunk(&mut context, window.first, window.last)?;
    Ok(chunk.iter().sum())
}

/// Runs `cycles` write cycles over a Double ring column. A producer thread
/// feeds one batch per cycle over a bounded channel; while each batch is
/// appended to `current`, `readers` threads sum `previous` and must agree.
pub fn pump(capacity: usize, cycles: u64, batch: usize, readers: usize) -> Result<PumpReport> {
    let mut column = DoubleRingColumn::new(capacity)?;
    let (tx_batch, rx_batch) = bounded::<Vec<f64>>(2);

    let producer = thread::spawn(move || {
        for cycle in 0..cycles {
            if tx_batch.send(tick_batch(cycle, batch)).is_err() {
                break;
            }
        }
    });

    let mut stats = Vec::new();
    let mut total_appended = 0usize;
    while let Ok(values) = rx_batch.recv() {
        let cycle = column.generation();
        let mut writer = column.begin_cycle();
        let previous = writer.previous_accessor();

        let sums = thread::scope(|scope| {
            let handles: Vec<_> = (0..readers)
                .map(|_| scope.spawn(move || sum_window(previous)))
                .collect();
            writer.append_slice(&values);
            handles
                .into_iter()
                .map(|h| h.join().map_err(|_| anyhow!("reader thread panicked"))?)
                .collect::<Result<Vec<f64>>>()
        })?;
        drop(writer);

        let previous_sum = match sums.first() {
            Some(first) => {
                if sums.iter().any(|s| s.to_bits() != first.to_bits()) {
                    bail!("readers disagree on cycle {}: {:?}", cycle, sums);
                }
                *first
            }
            None => sum_window(column.accessor(Generation::Previous))?,
        };

        let previous_window = column.previous().indices();
        let update = column.pending_update();
        column.advance_generation();
        total_appended += values.len();
        debug!("[pump] cycle {} appended {} rows", cycle, values.len());

        stats.push(CycleStats {
            cycle,
            appended: values.len(),
            previous_window,
            previous_sum,
            update,
        });
    }

    producer
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;

    Ok(PumpReport {
        cycles: stats,
        total_appended,
        final_window: column.previous().indices(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_advances_once_per_cycle() {
        let report = pump(8, 5, 3, 2).unwrap();
        assert_eq!(report.cycles.len(), 5);
        assert_eq!(report.total_appended, 15);
        assert_eq!(report.final_window, KeyRange::new(7, 14));

        // cycle 0 readers see an empty previous generation
        assert_eq!(report.cycles[0].previous_window, None);
        assert_eq!(report.cycles[0].previous_sum, 0.0);
        assert_eq!(report.cycles[1].previous_window, KeyRange::new(0, 2));
        assert_eq!(report.cycles[3].update.added, KeyRange::new(9, 11));
        assert_eq!(report.cycles[3].update.removed, KeyRange::new(1, 3));
    }

    #[test]
    fn test_pump_without_readers() {
        let report = pump(4, 3, 2, 0).unwrap();
        let expected: f64 = tick_batch(0, 2).iter().chain(&tick_batch(1, 2)).sum();
        assert!((report.cycles[2].previous_sum - expected).abs() < 1e-9);
    }
}
