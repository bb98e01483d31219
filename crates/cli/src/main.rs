use clap::{Parser, Subcommand};
use hrm_core::constants::DEFAULT_DATA_DIR;
use hrm_core::{CoreConfig, Identity, NewRecord, RegistryService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hrm")]
#[command(about = "HRM medical records registry CLI")]
struct Cli {
    /// Directory holding the registry snapshot
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Identity to act as (required for doctor-only commands)
    #[arg(long)]
    caller: Option<Identity>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the caller as a doctor
    RegisterDoctor,
    /// Check whether an identity is a doctor
    IsDoctor {
        /// Identity to check
        identity: Identity,
    },
    /// Enroll a patient (or rename an enrolled one)
    EnrollPatient {
        /// Patient identity
        patient_id: Identity,
        /// Patient name
        name: String,
    },
    /// Show one patient
    Patient {
        /// Patient identity
        patient_id: Identity,
    },
    /// List all patients
    Patients,
    /// Append a record to a patient's history
    AddRecord {
        /// Patient identity
        patient_id: Identity,
        /// Patient name as it should appear on the record
        patient_name: String,
        /// Content identifier of the stored file
        cid: String,
        /// Original file name
        file_name: String,
        /// Diagnosis
        diagnosis: String,
        /// Treatment
        treatment: String,
    },
    /// List a patient's records
    Records {
        /// Patient identity
        patient_id: Identity,
    },
}

fn require_caller(caller: Option<Identity>) -> Result<Identity, Box<dyn std::error::Error>> {
    caller.ok_or_else(|| "this command needs --caller <identity>".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    run(Cli::parse())
}

/// Executes one command. Registry failures are returned so the process exits non-zero.
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Some(command) = cli.command else {
        println!("Use 'hrm --help' for commands");
        return Ok(());
    };

    let cfg = Arc::new(CoreConfig::new(Some(cli.data_dir))?);
    let registry = RegistryService::new(cfg)?;

    match command {
        Commands::RegisterDoctor => {
            let caller = require_caller(cli.caller)?;
            registry.register_doctor(&caller)?;
            println!("{} is registered as a doctor", caller);
        }
        Commands::IsDoctor { identity } => {
            let is_doctor = registry.is_doctor(&identity)?;
            println!("{}: {}", identity, if is_doctor { "doctor" } else { "not a doctor" });
        }
        Commands::EnrollPatient { patient_id, name } => {
            let caller = require_caller(cli.caller)?;
            let p = registry.enroll_patient(&caller, patient_id, name)?;
            println!("Enrolled patient {} ({})", p.id, p.name);
        }
        Commands::Patient { patient_id } => {
            let p = registry.patient(&patient_id)?;
            println!("ID: {}, Name: {}", p.id, p.name);
        }
        Commands::Patients => {
            let caller = require_caller(cli.caller)?;
            let patients = registry.all_patients(&caller)?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for p in patients {
                let count = registry.record_count(&caller, &p.id)?;
                println!("ID: {}, Name: {}, Records: {}", p.id, p.name, count);
            }
        }
        Commands::AddRecord {
            patient_id,
            patient_name,
            cid,
            file_name,
            diagnosis,
            treatment,
        } => {
            let caller = require_caller(cli.caller)?;
            let new = NewRecord {
                cid,
                file_name,
                patient_name,
                patient_id,
                diagnosis,
                treatment,
            };
            let r = registry.append_record(&caller, new)?;
            println!("Added record {} for patient {}", r.cid, r.patient_id);
        }
        Commands::Records { patient_id } => {
            let caller = require_caller(cli.caller)?;
            let records = registry.patient_records(&caller, &patient_id)?;
            if records.is_empty() {
                println!("No records found.");
            }
            for (i, r) in records.iter().enumerate() {
                println!(
                    "#{} CID: {}, File: {}, Patient: {}, Diagnosis: {}, Treatment: {}, Doctor: {}",
                    i + 1,
                    r.cid,
                    r.file_name,
                    r.patient_name,
                    r.diagnosis,
                    r.treatment,
                    r.doctor_id
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrm_core::RegistryError;
    use tempfile::TempDir;

    fn cli(dir: &TempDir, args: &[&str]) -> Cli {
        let mut argv = vec!["hrm", "--data-dir", dir.path().to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_commands_share_snapshot_state() {
        let dir = TempDir::new().unwrap();
        run(cli(&dir, &["--caller", "D1", "register-doctor"])).unwrap();
        run(cli(&dir, &["--caller", "D1", "enroll-patient", "P1", "Alice"])).unwrap();
        run(cli(
            &dir,
            &[
                "--caller", "D1", "add-record", "P1", "Alice", "Qm1", "report.pdf", "Flu", "Rest",
            ],
        ))
        .unwrap();
        run(cli(&dir, &["--caller", "D1", "records", "P1"])).unwrap();
        run(cli(&dir, &["patient", "P1"])).unwrap();
    }

    #[test]
    fn test_registry_failures_are_returned() {
        let dir = TempDir::new().unwrap();

        let err = run(cli(&dir, &["--caller", "C", "enroll-patient", "P1", "Alice"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::Unauthorized { .. })
        ));

        let err = run(cli(&dir, &["patient", "P1"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::PatientNotFound(_))
        ));

        assert!(run(cli(&dir, &["patients"])).is_err());
    }
}
