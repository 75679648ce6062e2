use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use nr_reader::analysis::derived::proper_distance_series;
use nr_reader::data::export::{write_csv, write_parquet};
use nr_reader::{Integrator, NrDataReader, ReaderConfig, Regulariser};

fn main() -> Result<()> {
    env_logger::init();

    let Some(config_path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: nr-reader <config.json>");
    };
    let config = ReaderConfig::from_path(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let mut reader = NrDataReader::open(&config.grid_root)?;
    reader.load()?;
    log::info!(
        "Loaded {} variables from {}",
        reader.variables().len(),
        reader.data_dir().display()
    );

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    for dataset in reader.datasets() {
        let csv_path = config.output_dir.join(format!("{}.csv", dataset.variable));
        write_csv(dataset, &csv_path)?;
        log::info!("Wrote {} rows to {}", dataset.len(), csv_path.display());

        if config.export_parquet {
            let pq_path = config.output_dir.join(format!("{}.parquet", dataset.variable));
            write_parquet(dataset, &pq_path)?;
            log::info!("Wrote {}", pq_path.display());
        }
    }

    if let Some(pd) = &config.proper_distance {
        let g_xx = reader.variable(&pd.variable)?;
        let regulariser = Regulariser::from_config(&config);
        let integrator = Integrator::from_config(&config);
        let series = proper_distance_series(
            g_xx,
            pd.lower,
            pd.upper,
            Some((&regulariser, config.singularity)),
            &integrator,
        )
        .with_context(|| format!("proper distance from '{}'", pd.variable))?;

        println!("time,proper_distance,abs_error");
        for (time, result) in series {
            println!("{time},{},{}", result.value, result.abs_error);
        }
    }

    Ok(())
}
