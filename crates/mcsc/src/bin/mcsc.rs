use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mcsc::{ExecuteOptions, McscError, McscSettings, MultiCamSelfCal};

#[derive(Debug, Parser)]
#[command(name = "mcsc", version, about = "Run MultiCamSelfCal on a prepared directory")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run the solver on a calibration directory and wait for it.
    Run {
        /// Directory holding camera_order.txt, IdMat.dat, points.dat, Res.dat
        /// and multicamselfcal.cfg.
        dir: PathBuf,
        /// Settings JSON (solver paths, basename).
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Result directory (default: <dir>/result).
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Use MATLAB instead of Octave.
        #[arg(long)]
        matlab: bool,
        /// Only check the input files exist, do not copy them.
        #[arg(long)]
        no_copy: bool,
        /// Let the solver write to this terminal instead of STDOUT/STDERR files.
        #[arg(long)]
        verbose_solver: bool,
    },
    /// Print the reconstructed 3D points of a result directory.
    Points { dir: PathBuf },
    /// Print camera order, rad file names and poses of a result directory.
    Order {
        dir: PathBuf,
        #[arg(long, default_value = "cam")]
        basename: String,
    },
    /// Write a settings JSON with default values.
    InitSettings { path: PathBuf },
}

fn init_logging(verbose: u8) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        mcsc::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = mcsc::core::init_from_verbosity(verbose);
    }
}

fn run(cli: Cli) -> Result<ExitCode, McscError> {
    match cli.command {
        Cmd::Run {
            dir,
            settings,
            dest,
            matlab,
            no_copy,
            verbose_solver,
        } => {
            let mut settings = match settings {
                Some(path) => McscSettings::load_json(path)?,
                None => McscSettings::default(),
            };
            settings.out_dir = Some(dir);
            settings.use_matlab |= matlab;

            let cal = MultiCamSelfCal::new(settings)?;
            let opts = ExecuteOptions {
                dest,
                silent: !verbose_solver,
                copy_files: !no_copy,
            };
            let outcome = cal.execute_blocking(&opts)?;
            println!("result directory: {}", outcome.result_dir.display());
            if outcome.success() {
                Ok(ExitCode::SUCCESS)
            } else {
                if let Some(stderr) = &outcome.stderr {
                    eprintln!("solver failed, see {}", stderr.display());
                }
                let code = outcome.exit_code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
                Ok(ExitCode::from(code))
            }
        }
        Cmd::Points { dir } => {
            let result = mcsc::read_calibration_result_inliers(&dir)?;
            for p in result.points()? {
                println!("{} {} {}", p.x, p.y, p.z);
            }
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Order { dir, basename } => {
            let names = mcsc::camera_name_map(&dir, &basename)?;
            let order = mcsc::read_camera_order(&dir)?;
            for id in order.iter() {
                println!("{id} {}", names[id]);
            }
            if let Ok(result) = mcsc::read_calibration_result_inliers(&dir) {
                for pose in result.camera_poses(&order)? {
                    println!(
                        "{} center=({:.4}, {:.4}, {:.4})",
                        pose.cam_id, pose.center.x, pose.center.y, pose.center.z
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Cmd::InitSettings { path } => {
            McscSettings::default().write_json(&path)?;
            println!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
