//! Claim feature schema
//!
//! The ordered list of input columns the scaler and model were fitted on.
//! Position in [`FEATURE_SCHEMA`] is the column index of the feature vector,
//! so the order here must never change independently of the artifacts.
//! The schema is every claim column except the reimbursed amount the model
//! was trained to predict.

/// Number of features in every prediction request.
pub const NUM_FEATURES: usize = 57;

/// Feature names in model column order.
pub const FEATURE_SCHEMA: [&str; NUM_FEATURES] = [
    "BeneID",
    "ClaimID",
    "Provider",
    "AttendingPhysician",
    "OperatingPhysician",
    "OtherPhysician",
    "ClmDiagnosisCode_1",
    "ClmDiagnosisCode_2",
    "ClmDiagnosisCode_3",
    "ClmDiagnosisCode_4",
    "ClmDiagnosisCode_5",
    "ClmDiagnosisCode_6",
    "ClmDiagnosisCode_7",
    "ClmDiagnosisCode_8",
    "ClmDiagnosisCode_9",
    "ClmDiagnosisCode_10",
    "ClmProcedureCode_1",
    "ClmProcedureCode_2",
    "ClmProcedureCode_3",
    "ClmProcedureCode_4",
    "ClmProcedureCode_5",
    "ClmProcedureCode_6",
    "DeductibleAmtPaid",
    "ClmAdmitDiagnosisCode",
    "Gender",
    "Race",
    "RenalDiseaseIndicator",
    "State",
    "County",
    "NoOfMonths_PartACov",
    "NoOfMonths_PartBCov",
    "ChronicCond_Alzheimer",
    "ChronicCond_Heartfailure",
    "ChronicCond_KidneyDisease",
    "ChronicCond_Cancer",
    "ChronicCond_ObstrPulmonary",
    "ChronicCond_Depression",
    "ChronicCond_Diabetes",
    "ChronicCond_IschemicHeart",
    "ChronicCond_Osteoporasis",
    "ChronicCond_rheumatoidarthritis",
    "ChronicCond_stroke",
    "IPAnnualReimbursementAmt",
    "IPAnnualDeductibleAmt",
    "OPAnnualReimbursementAmt",
    "OPAnnualDeductibleAmt",
    "IsDeceased",
    "Age",
    "ClaimDuration",
    "AgeAtClaim",
    "ClaimLengthCategory",
    "AgeCategory",
    "NumChronicConditions",
    "NumDiagnoses",
    "NumProcedures",
    "AgeChronicInteraction",
    "DurationProcedureInteraction",
];

/// Column index of a schema feature, if `name` is one.
#[must_use]
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|f| *f == name)
}
