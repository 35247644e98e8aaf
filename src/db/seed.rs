use argon2::Argon2;

use super::document::{StoreDocument, SCHEMA_VERSION};
use crate::{
    util::hash_password, PaymentData, PaymentStatus, SubmissionData, SubmissionStatus, UserData,
};

/// Builds the fixed dataset the demo starts out with: one admin, one
/// member, the member's payment, and two of their submissions.
pub(crate) fn seed_document() -> StoreDocument {
    let argon = Argon2::default();

    let admin = UserData {
        id: "admin-001".to_string(),
        name: "Agrigence Admin".to_string(),
        email: "admin@agrigence.org".to_string(),
        password: hash_password(&argon, "admin123").expect("seed password hashes"),
        phone: "+254 700 000 001".to_string(),
        gender: "Female".to_string(),
        dob: "1985-03-12".to_string(),
        occupation: "Editor".to_string(),
        organization: "Agrigence Journal".to_string(),
        address: "Nairobi, Kenya".to_string(),
        is_admin: true,
        profile_photo: None,
    };

    let john = UserData {
        id: "user-001".to_string(),
        name: "John Mwangi".to_string(),
        email: "john@example.com".to_string(),
        password: hash_password(&argon, "user123").expect("seed password hashes"),
        phone: "+254 712 345 678".to_string(),
        gender: "Male".to_string(),
        dob: "1990-07-24".to_string(),
        occupation: "Agronomist".to_string(),
        organization: "Kilimo Research Institute".to_string(),
        address: "Nakuru, Kenya".to_string(),
        is_admin: false,
        profile_photo: None,
    };

    let payment = PaymentData {
        user_id: john.id.clone(),
        status: PaymentStatus::Paid,
        amount: "KES 2,000".to_string(),
        date: "2024-01-15".to_string(),
        payment_id: "PAY-2024-0001".to_string(),
        method: "M-Pesa".to_string(),
        receipt_number: "RCP-0001".to_string(),
        receipt_path: "/receipts/RCP-0001.pdf".to_string(),
    };

    let submissions = vec![
        SubmissionData {
            id: "SUB-001".to_string(),
            user_id: john.id.clone(),
            title: "Drought-tolerant maize varieties in semi-arid Kenya".to_string(),
            date: "2024-02-02".to_string(),
            status: SubmissionStatus::UnderReview,
            file_name: "maize-varieties.pdf".to_string(),
            file_path: "/submissions/SUB-001/maize-varieties.pdf".to_string(),
            remarks: String::new(),
        },
        SubmissionData {
            id: "SUB-002".to_string(),
            user_id: john.id.clone(),
            title: "Soil nitrogen response to intercropped legumes".to_string(),
            date: "2024-03-18".to_string(),
            status: SubmissionStatus::RevisionRequired,
            file_name: "soil-nitrogen.pdf".to_string(),
            file_path: "/submissions/SUB-002/soil-nitrogen.pdf".to_string(),
            remarks: "Expand the methodology section.".to_string(),
        },
    ];

    StoreDocument {
        version: SCHEMA_VERSION,
        users: vec![admin, john],
        payments: vec![payment],
        submissions,
        sessions: vec![],
        reset_tokens: vec![],
    }
}
