use shared_types::FormType;

/// Revision of [`ISSUANCE_PAGE_ORDER`]. Bump when the sequence changes so
/// previously issued files can still be told apart.
pub const ISSUANCE_PAGE_ORDER_VERSION: u32 = 1;

/// Physical page order of an issued case file. The proceedings log always
/// leads; form types without an approved form are skipped.
pub const ISSUANCE_PAGE_ORDER: [FormType; 7] = [
    FormType::CaseRoznama,
    FormType::Notice130,
    FormType::AccusedBondTimeRequest,
    FormType::InterimBond125126,
    FormType::StatementAccused,
    FormType::StatementWitness,
    FormType::FinalOrder,
];
