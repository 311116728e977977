// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use serde::{Deserialize, Serialize};

use crate::{DateFormat, Frequency, PathTargeting};

/// How visitors prove their age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    /// A simple Yes/No question
    #[default]
    Question,

    /// A typed date of birth
    Dob,
}

/// The outcome recorded in a visitor session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    /// The visitor passed the age check
    Passed,

    /// The visitor failed or declined the age check
    Denied,
}

impl GateState {
    /// Whether this is the [`GateState::Passed`] state
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Where to send the visitor once the gate was answered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Redirects {
    /// Internal path or absolute URL to go to after passing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,

    /// Internal path or absolute URL to go to after being denied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Redirects {
    /// The redirect to use for the given outcome, if any
    #[must_use]
    pub fn for_state(&self, state: GateState) -> Option<&str> {
        match state {
            GateState::Passed => self.success.as_deref(),
            GateState::Denied => self.failure.as_deref(),
        }
    }
}

/// Texts shown in the gate modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateStrings {
    pub modal_title: String,
    pub message_confirm: String,
    pub confirm_button: String,
    pub deny_button: String,
    pub denied_message: String,
    pub question_text: String,
    pub yes_button: String,
    pub no_button: String,
    pub dob_instruction: String,
    pub dob_verify_button: String,
    pub dob_invalid_message: String,
}

impl Default for GateStrings {
    fn default() -> Self {
        Self {
            modal_title: "Age Verification Required".to_owned(),
            message_confirm: "You must be of legal age to enter this site.".to_owned(),
            confirm_button: "Enter".to_owned(),
            deny_button: "Leave".to_owned(),
            denied_message: "Sorry, you do not meet the age requirement for this site."
                .to_owned(),
            question_text: "Are you over the age of [age]?".to_owned(),
            yes_button: "Yes".to_owned(),
            no_button: "No".to_owned(),
            dob_instruction: "Please enter your date of birth to verify your age:".to_owned(),
            dob_verify_button: "Verify".to_owned(),
            dob_invalid_message: "Please enter a valid date of birth.".to_owned(),
        }
    }
}

/// Site-wide settings of the gate, read-only to the request handlers
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Whether the gate is shown at all
    pub enabled: bool,

    /// How visitors prove their age
    pub method: VerificationMethod,

    /// Minimum age, in years, to pass the gate
    pub min_age: u32,

    /// Field ordering of typed dates of birth
    pub date_format: DateFormat,

    /// How often visitors have to verify again
    pub frequency: Frequency,

    /// Where to send visitors once they answered
    pub redirects: Redirects,

    /// Which pages are gated
    pub targeting: PathTargeting,

    /// Texts shown in the modal
    pub strings: GateStrings,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: VerificationMethod::default(),
            min_age: 18,
            date_format: DateFormat::default(),
            frequency: Frequency::default(),
            redirects: Redirects::default(),
            targeting: PathTargeting::default(),
            strings: GateStrings::default(),
        }
    }
}

impl GateConfig {
    /// The outcome for a visitor of the given age
    #[must_use]
    pub fn state_for_age(&self, age: u32) -> GateState {
        if age >= self.min_age {
            GateState::Passed
        } else {
            GateState::Denied
        }
    }
}
