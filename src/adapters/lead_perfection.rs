//! Lead Perfection：透過預存程序寫入名單，不走 HTTP。

use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::dispatcher::DispatchPlan;
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::core::normalizer::{DigitKeep, Transform};
use crate::core::procedure::{bind, ParamSpec, ProcedureCall};
use crate::domain::model::LeadRecord;
use crate::domain::ports::ConnectionSpec;
use crate::utils::error::{RelayError, Result};

pub const DATE_RECEIVED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 程序參數表，依綁定順序排列
pub const PARAMS: &[ParamSpec] = &[
    ParamSpec::text("firstname", "@firstname", 25),
    ParamSpec::text("lastname", "@lastname", 25),
    ParamSpec::text("email", "@email", 100),
    ParamSpec::text("phone", "@phone", 15),
    ParamSpec::text("phonetype", "@phonetype", 1),
    ParamSpec::text("phone2", "@phone2", 15),
    ParamSpec::text("phonetype2", "@phonetype2", 1),
    ParamSpec::text("phone3", "@phone3", 15),
    ParamSpec::text("phonetype3", "@phonetype3", 1),
    ParamSpec::text("address1", "@address1", 35),
    ParamSpec::text("city", "@city", 35),
    ParamSpec::text("state", "@state", 2),
    ParamSpec::text("zip", "@zip", 5),
    ParamSpec::text("notes", "@notes", 2000),
    ParamSpec::text("productID", "@productID", 10),
    ParamSpec::text("proddescr", "@proddescr", 20),
    ParamSpec::text("sender", "@sender", 100),
    ParamSpec::text("sentto", "@sentto", 100),
    ParamSpec::bit("callmorning", "@callmorning"),
    ParamSpec::bit("callafternoon", "@callafternoon"),
    ParamSpec::bit("callevening", "@callevening"),
    ParamSpec::bit("callweekend", "@callweekend"),
    ParamSpec::text("datereceived", "@datereceived", 19),
    ParamSpec::int("srs_id", "@srs_id"),
    ParamSpec::text("Source", "@Source", 15).optional(),
    ParamSpec::bit("ForceSource", "@ForceSource").optional(),
    ParamSpec::int("LogNumber", "@LogNumber").optional(),
    ParamSpec::text("adword", "@adword", 50).optional(),
    ParamSpec::int("pro_id", "@pro_id").optional(),
    ParamSpec::int("hear_about_us", "@User18").optional(),
];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LeadPerfectionConfig {
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub procedure: Option<String>,
    /// 設為 false 時不要求子來源編號
    pub srs_id: Option<bool>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadPerfectionConfig {
    fn connection(&self) -> Result<ConnectionSpec> {
        let invalid = |_| RelayError::config(self.name(), "Credentials is invalid");
        Ok(ConnectionSpec {
            server: require(self.name(), "server", &self.server).map_err(invalid)?.to_string(),
            user: require(self.name(), "user", &self.user).map_err(invalid)?.to_string(),
            password: require(self.name(), "password", &self.password).map_err(invalid)?.to_string(),
            database: require(self.name(), "database", &self.database).map_err(invalid)?.to_string(),
        })
    }

    fn procedure(&self) -> Result<&str> {
        require(self.name(), "procedure", &self.procedure)
            .map_err(|_| RelayError::config(self.name(), "Credentials is invalid"))
    }
}

impl LeadAdapter for LeadPerfectionConfig {
    fn name(&self) -> &'static str {
        "Lead Perfection"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        self.connection()?;
        self.procedure().map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        let text = |name: &str, max_length: usize| FieldSpec::new(name).keep_empty().max_length(max_length);
        let digits = Transform::Digits(DigitKeep::All);

        Schema::new(vec![
            text("firstname", 25)
                .aliases(&["first_name"])
                .from(Standard::FirstName),
            text("lastname", 25)
                .aliases(&["last_name"])
                .from(Standard::LastName),
            text("email", 100)
                .aliases(&["email1"])
                .from(Standard::Email),
            text("phone", 15)
                .aliases(&["phone1"])
                .from(Standard::Phone)
                .transform(digits),
            text("phonetype", 1).aliases(&["phonetype1"]).literal("1"),
            text("phone2", 15).transform(digits),
            text("phonetype2", 1).literal("3"),
            text("phone3", 15).transform(digits),
            text("phonetype3", 1),
            text("address1", 35)
                .aliases(&["address"])
                .from(Standard::Address),
            text("city", 35).from(Standard::City),
            text("state", 2)
                .from(Standard::State)
                .transform(Transform::StateCode),
            text("zip", 5)
                .aliases(&["zip_code", "postal_code"])
                .from(Standard::Zip)
                .transform(digits),
            text("notes", 2000).joined().from(Standard::FormInfo),
            text("productID", 10),
            text("proddescr", 20),
            text("sender", 100),
            text("sentto", 100),
            FieldSpec::new("callmorning").keep_empty(),
            FieldSpec::new("callafternoon").keep_empty(),
            FieldSpec::new("callevening").keep_empty(),
            FieldSpec::new("callweekend").keep_empty(),
            text("datereceived", 19).timestamp(DATE_RECEIVED_FORMAT),
            FieldSpec::new("srs_id").keep_empty(),
            FieldSpec::new("Source").max_length(15),
            FieldSpec::new("adword").max_length(50),
            FieldSpec::new("pro_id"),
            FieldSpec::new("hear_about_us"),
            FieldSpec::new("LogNumber"),
            FieldSpec::new("ForceSource"),
        ])
        .map(Schema::coerce_scalars)
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("firstname")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["lastname", "email", "phone", "phone2", "phone3", "address1"])
    }

    fn validate(&self, record: &LeadRecord, _schema: &Schema) -> Result<()> {
        if self.srs_id != Some(false) && !record.is_filled("srs_id") {
            return Err(RelayError::validation(self.name(), "srs_id is missing"));
        }
        bind(record, PARAMS).map(|_| ())
    }

    fn plan(&self, record: &LeadRecord, _context: &PlanContext) -> Result<DispatchPlan> {
        Ok(DispatchPlan::Procedure(ProcedureCall {
            connection: self.connection()?,
            procedure: self.procedure()?.to_string(),
            params: bind(record, PARAMS)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapper::map;
    use crate::core::normalizer::normalize;
    use crate::domain::model::FormContext;
    use crate::domain::ports::ParamValue;

    fn config() -> LeadPerfectionConfig {
        LeadPerfectionConfig {
            server: Some("sql.example.com".to_string()),
            user: Some("lp".to_string()),
            password: Some("pw".to_string()),
            database: Some("leads".to_string()),
            procedure: Some("dbo.AddLead".to_string()),
            ..LeadPerfectionConfig::default()
        }
    }

    fn prepared(config: &LeadPerfectionConfig, input: LeadRecord) -> anyhow::Result<(LeadRecord, Schema)> {
        let schema = config.schema()?;
        let record = map(&input, &FormContext::default(), &schema, &config.custom_fields(), ", ");
        Ok((normalize(record, &schema), schema))
    }

    #[test]
    fn test_srs_id_required_unless_disabled() -> anyhow::Result<()> {
        let config = config();
        let (record, schema) = prepared(&config, LeadRecord::from_pairs([("firstname", "Jane")]))?;
        let error = config.validate(&record, &schema).unwrap_err();
        assert!(error.to_string().contains("srs_id is missing"));

        let relaxed = LeadPerfectionConfig {
            srs_id: Some(false),
            ..config
        };
        assert!(relaxed.validate(&record, &schema).is_ok());
        Ok(())
    }

    #[test]
    fn test_params_are_typed_and_trimmed() -> anyhow::Result<()> {
        let config = config();
        let (record, _) = prepared(
            &config,
            LeadRecord::from_pairs([
                ("firstname", "Bartholomew-Maximilian Jr."),
                ("phone", "(555) 123-4567"),
                ("state", "Georgia"),
                ("zip", "30301-1234"),
                ("callmorning", "1"),
                ("srs_id", "12"),
                ("hear_about_us", "7"),
            ]),
        )?;
        let DispatchPlan::Procedure(call) = config.plan(&record, &PlanContext::default())? else {
            panic!("expected a procedure call");
        };
        assert_eq!(call.procedure, "dbo.AddLead");

        let param = |name: &str| call.params.iter().find(|param| param.name == name).map(|param| param.value.clone());
        assert_eq!(param("@firstname"), Some(ParamValue::Text("Bartholomew-Maximilian Jr".to_string())));
        assert_eq!(param("@phone"), Some(ParamValue::Text("5551234567".to_string())));
        assert_eq!(param("@state"), Some(ParamValue::Text("GA".to_string())));
        assert_eq!(param("@zip"), Some(ParamValue::Text("30301".to_string())));
        assert_eq!(param("@phonetype"), Some(ParamValue::Text("1".to_string())));
        assert_eq!(param("@callmorning"), Some(ParamValue::Bit(true)));
        assert_eq!(param("@callevening"), Some(ParamValue::Bit(false)));
        assert_eq!(param("@srs_id"), Some(ParamValue::Int(12)));
        assert_eq!(param("@User18"), Some(ParamValue::Int(7)));
        assert_eq!(param("@Source"), None);
        assert_eq!(param("@LogNumber"), None);
        Ok(())
    }

    #[test]
    fn test_missing_credentials() {
        let config = LeadPerfectionConfig {
            database: None,
            ..config()
        };
        let error = config.check_config().unwrap_err();
        assert!(error.to_string().contains("Credentials is invalid"));
    }
}
