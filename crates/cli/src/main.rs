use api_shared::pb::{
    create_patient_request, ehr_client::EhrClient, update_patient_request, BloodType,
    CreatePatientRequest, DeletePatientRequest, GetAllPatientsRequest, GetPatientRequest,
    PatientMessage, PatientPatch, SearchPatientByIdRequest, UpdateMode, UpdatePatientRequest,
};
use clap::{Args, Parser, Subcommand};
use tonic::transport::Channel;

const DEFAULT_SERVER: &str = "http://localhost:50051";

#[derive(Parser)]
#[command(name = "ehr")]
#[command(about = "EHR patient record gRPC client")]
struct Cli {
    /// gRPC server address
    #[arg(long, global = true, default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is alive
    Health,
    /// Create a patient
    Create {
        /// External patient identifier
        #[arg(long)]
        patient_id: String,
        #[command(flatten)]
        fields: PatientFields,
    },
    /// Get a patient by internal UUID
    Get { uuid: String },
    /// List patients
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        /// Page size; 0 selects the server default
        #[arg(long, default_value_t = 0)]
        limit: u32,
    },
    /// Find a patient by external patient identifier
    Search { patient_id: String },
    /// Update a patient
    Update {
        uuid: String,
        #[command(flatten)]
        fields: PatientFields,
        /// Replace all mutable fields instead of merging
        #[arg(long)]
        full: bool,
    },
    /// Delete a patient
    Delete { uuid: String },
    /// Run the create/get/search/update/list/delete walkthrough
    Demo,
}

#[derive(Args, Default)]
struct PatientFields {
    #[arg(long)]
    name: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    birth_date: Option<String>,
    /// Height in cm
    #[arg(long)]
    height: Option<i32>,
    /// Weight in kg
    #[arg(long)]
    weight: Option<i32>,
    /// Blood type label, e.g. "A+" or "O-"
    #[arg(long, value_parser = parse_blood_type)]
    blood_type: Option<BloodType>,
    #[arg(long)]
    diagnosis: Option<String>,
}

impl PatientFields {
    fn into_message(self, patient_id: String) -> PatientMessage {
        PatientMessage {
            patient_id,
            name: self.name.unwrap_or_default(),
            birth_date: self.birth_date.unwrap_or_default(),
            height: self.height,
            weight: self.weight,
            blood_type: self.blood_type.unwrap_or(BloodType::Unspecified) as i32,
            diagnosis: self.diagnosis.unwrap_or_default(),
            ..Default::default()
        }
    }

    fn into_patch(self) -> PatientPatch {
        PatientPatch {
            name: self.name,
            birth_date: self.birth_date,
            height: self.height,
            weight: self.weight,
            blood_type: self.blood_type.map(|b| b as i32),
            diagnosis: self.diagnosis,
            ..Default::default()
        }
    }
}

fn parse_blood_type(label: &str) -> Result<BloodType, String> {
    BloodType::from_label(label).ok_or_else(|| {
        format!(
            "unknown blood type '{label}', expected one of: {}",
            api_shared::blood_type::LABELS.join(", ")
        )
    })
}

fn print_patient(patient: &PatientMessage) {
    let measurement = |v: Option<i32>, unit: &str| {
        v.map(|v| format!("{v} {unit}"))
            .unwrap_or_else(|| "-".into())
    };
    println!("UUID: {}", patient.id);
    println!("  Patient ID: {}", patient.patient_id);
    println!("  Name: {}", patient.name);
    println!("  Birth Date: {}", patient.birth_date);
    println!("  Height: {}", measurement(patient.height, "cm"));
    println!("  Weight: {}", measurement(patient.weight, "kg"));
    println!("  Blood Type: {}", BloodType::from_ordinal(patient.blood_type).label());
    println!("  Diagnosis: {}", patient.diagnosis);
    println!("  Created: {}", patient.created_at);
    println!("  Updated: {}", patient.updated_at);
}

fn expect_patient(patient: Option<PatientMessage>) -> anyhow::Result<PatientMessage> {
    patient.ok_or_else(|| anyhow::anyhow!("server response carried no patient"))
}

async fn create(
    client: &mut EhrClient<Channel>,
    patient: PatientMessage,
) -> anyhow::Result<PatientMessage> {
    let response = client
        .create_patient(CreatePatientRequest {
            payload: Some(create_patient_request::Payload::Patient(patient)),
        })
        .await?;
    expect_patient(response.into_inner().patient)
}

async fn update(
    client: &mut EhrClient<Channel>,
    uuid: String,
    patch: PatientPatch,
    mode: UpdateMode,
) -> anyhow::Result<PatientMessage> {
    let response = client
        .update_patient(UpdatePatientRequest {
            patient_uuid: uuid,
            mode: mode as i32,
            changes: Some(update_patient_request::Changes::Patch(patch)),
        })
        .await?;
    expect_patient(response.into_inner().patient)
}

async fn run(client: &mut EhrClient<Channel>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Health => {
            let res = client.health(()).await?.into_inner();
            println!("{} (ok: {})", res.message, res.ok);
        }
        Commands::Create { patient_id, fields } => {
            let created = create(client, fields.into_message(patient_id)).await?;
            print_patient(&created);
        }
        Commands::Get { uuid } => {
            let response = client
                .get_patient(GetPatientRequest { patient_uuid: uuid })
                .await?;
            print_patient(&expect_patient(response.into_inner().patient)?);
        }
        Commands::List { skip, limit } => {
            let patients = client
                .get_all_patients(GetAllPatientsRequest { skip, limit })
                .await?
                .into_inner()
                .patients;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!(
                    "{}  {}  {}  {}",
                    patient.id, patient.patient_id, patient.name, patient.birth_date
                );
            }
        }
        Commands::Search { patient_id } => {
            let response = client
                .search_patient_by_id(SearchPatientByIdRequest { patient_id })
                .await?;
            print_patient(&expect_patient(response.into_inner().patient)?);
        }
        Commands::Update { uuid, fields, full } => {
            let mode = if full {
                UpdateMode::Full
            } else {
                UpdateMode::Partial
            };
            let updated = update(client, uuid, fields.into_patch(), mode).await?;
            print_patient(&updated);
        }
        Commands::Delete { uuid } => {
            let res = client
                .delete_patient(DeletePatientRequest { patient_uuid: uuid })
                .await?
                .into_inner();
            println!("{}", res.message);
        }
        Commands::Demo => demo(client).await?,
    }
    Ok(())
}

/// Walks one patient through every RPC, stopping at the first failure.
async fn demo(client: &mut EhrClient<Channel>) -> anyhow::Result<()> {
    println!("EHR CRUD service demo");

    println!("\n1. Creating a new patient...");
    let created = create(
        client,
        PatientMessage {
            patient_id: "P001".into(),
            name: "John Doe".into(),
            birth_date: "1990-01-15".into(),
            height: Some(175),
            weight: Some(70),
            blood_type: BloodType::APositive as i32,
            diagnosis: "Healthy".into(),
            ..Default::default()
        },
    )
    .await?;
    print_patient(&created);

    println!("\n2. Retrieving patient by UUID...");
    let fetched = client
        .get_patient(GetPatientRequest {
            patient_uuid: created.id.clone(),
        })
        .await?;
    print_patient(&expect_patient(fetched.into_inner().patient)?);

    println!("\n3. Searching patient by patient_id...");
    let found = client
        .search_patient_by_id(SearchPatientByIdRequest {
            patient_id: created.patient_id.clone(),
        })
        .await?;
    print_patient(&expect_patient(found.into_inner().patient)?);

    println!("\n4. Updating patient diagnosis and weight...");
    let patch = PatientPatch {
        diagnosis: Some("Routine checkup - All normal".into()),
        weight: Some(72),
        ..Default::default()
    };
    let updated = update(client, created.id.clone(), patch, UpdateMode::Partial).await?;
    print_patient(&updated);

    println!("\n5. Retrieving all patients...");
    let patients = client
        .get_all_patients(GetAllPatientsRequest { skip: 0, limit: 10 })
        .await?
        .into_inner()
        .patients;
    println!("Retrieved {} patient(s)", patients.len());
    for (idx, patient) in patients.iter().enumerate() {
        println!("  {}. {} (ID: {})", idx + 1, patient.name, patient.patient_id);
    }

    println!("\n6. Deleting patient...");
    let deleted = client
        .delete_patient(DeletePatientRequest {
            patient_uuid: created.id,
        })
        .await?
        .into_inner();
    println!("{}", deleted.message);

    println!("\nDemo completed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut client = EhrClient::connect(cli.server).await?;
    run(&mut client, cli.command).await
}
