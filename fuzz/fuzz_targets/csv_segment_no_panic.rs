// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use co2cpd_cli::parse_scenario_csv;
use co2cpd_core::{Penalty, Stopping};
use co2cpd_offline::segment;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(store) = parse_scenario_csv(raw) else {
        return;
    };

    let window = (data.first().copied().unwrap_or(2) % 8).max(1) as usize;
    for series in store.iter() {
        for stopping in [
            Stopping::KnownK(0),
            Stopping::KnownK(2),
            Stopping::Penalized(Penalty::BIC),
        ] {
            if let Ok(change_points) = segment(series.values(), window, stopping) {
                assert!(change_points.windows(2).all(|pair| pair[0] + window <= pair[1]));
                assert!(change_points.iter().all(|&cp| cp > 0 && cp < series.len()));
            }
        }
    }
});
