use std::str::FromStr;

use shared::domain::AccountAddress;
use url::Url;

pub const DEFAULT_TRANSFER_AMOUNT: &str = "0.01";
pub const DEFAULT_FAUCET_URL: &str = "https://wallet.matic.network/faucet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    ToAddress,
    ToAmount,
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toAddress" | "to_address" | "to" | "address" => Ok(FormField::ToAddress),
            "toAmount" | "to_amount" | "amount" => Ok(FormField::ToAmount),
            other => Err(format!("unknown form field '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferForm {
    pub to_address: String,
    pub to_amount: String,
}

impl Default for TransferForm {
    fn default() -> Self {
        Self {
            to_address: String::new(),
            to_amount: DEFAULT_TRANSFER_AMOUNT.to_string(),
        }
    }
}

impl TransferForm {
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::ToAddress => self.to_address = value,
            FormField::ToAmount => self.to_amount = value,
        }
    }

    /// Updates the field named like the input that changed.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), String> {
        let field = name.parse::<FormField>()?;
        self.set(field, value);
        Ok(())
    }

    /// Submit stays disabled until both fields hold something.
    pub fn can_submit(&self) -> bool {
        !self.to_address.trim().is_empty() && !self.to_amount.trim().is_empty()
    }
}

pub fn faucet_link(base: &Url, account: &AccountAddress) -> Url {
    let mut link = base.clone();
    link.query_pairs_mut().append_pair("address", account.as_str());
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_form_prefills_amount_only() {
        let form = TransferForm::default();
        assert_eq!(form.to_amount, "0.01");
        assert!(form.to_address.is_empty());
        assert!(!form.can_submit());
    }

    #[test]
    fn submit_requires_both_fields() {
        let mut form = TransferForm::default();
        form.set(FormField::ToAddress, "0xabc");
        assert!(form.can_submit());

        form.set_field("toAmount", "   ").expect("known field");
        assert!(!form.can_submit());
        assert!(form.set_field("memo", "hi").is_err());
    }

    #[test]
    fn parses_field_names_from_inputs() {
        assert_eq!("toAddress".parse::<FormField>(), Ok(FormField::ToAddress));
        assert_eq!("amount".parse::<FormField>(), Ok(FormField::ToAmount));
        assert!("fee".parse::<FormField>().is_err());
    }

    #[test]
    fn faucet_link_carries_account() {
        let base = Url::parse(DEFAULT_FAUCET_URL).expect("url");
        let account =
            AccountAddress::parse("0x1111111111111111111111111111111111111111").expect("account");
        assert_eq!(
            faucet_link(&base, &account).as_str(),
            "https://wallet.matic.network/faucet?address=0x1111111111111111111111111111111111111111"
        );
    }
}
