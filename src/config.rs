// src/config.rs
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::Args;
use serde::{Serialize, Serializer};
use std::{fmt, path::PathBuf, str::FromStr};

use crate::analysis::AnalysisParams;
use crate::generate::GenerationPlan;

pub const DEFAULT_TARGET_MONTH: &str = "2024-01";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_CUR_PREFIX: &str = "cur-reports/";
pub const DEFAULT_VPC_LOGS_PREFIX: &str = "vpc-flow-logs/";
pub const DEFAULT_TOP_N: usize = 10;

/// A billing month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Month)
            .with_context(|| format!("invalid month {year:04}-{month:02}"))
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.0.year() && date.month() == self.0.month()
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (year, month) = match s.split_once('-') {
            Some((y, m)) if is_digits(y, 4) && is_digits(m, 2) => (y, m),
            _ => bail!("expected a month formatted as YYYY-MM, got {s:?}"),
        };
        let year: i32 = year
            .parse()
            .with_context(|| format!("invalid year in {s:?}"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("invalid month in {s:?}"))?;
        Month::new(year, month)
    }
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `1`, `true`, `yes` and `on` (any case) are truthy.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Connection settings shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct AwsArgs {
    /// AWS region used for the S3 and STS clients
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,
}

/// Where synthetic data goes.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Month the synthetic records fall into
    #[arg(long, env = "TARGET_MONTH", default_value = DEFAULT_TARGET_MONTH)]
    pub target_month: Month,

    #[arg(long, env = "CUR_BUCKET", default_value = "test-cur-bucket")]
    pub cur_bucket: String,

    #[arg(long, env = "CUR_PREFIX", default_value = DEFAULT_CUR_PREFIX)]
    pub cur_prefix: String,

    #[arg(long, env = "VPC_LOGS_BUCKET", default_value = "test-vpc-logs-bucket")]
    pub vpc_logs_bucket: String,

    #[arg(long, env = "VPC_LOGS_PREFIX", default_value = DEFAULT_VPC_LOGS_PREFIX)]
    pub vpc_logs_prefix: String,

    /// Seed for reproducible data; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

impl GenerateArgs {
    pub fn plan(&self) -> GenerationPlan {
        GenerationPlan {
            target_month: self.target_month,
            cur_bucket: self.cur_bucket.clone(),
            cur_prefix: self.cur_prefix.clone(),
            vpc_logs_bucket: self.vpc_logs_bucket.clone(),
            vpc_logs_prefix: self.vpc_logs_prefix.clone(),
        }
    }
}

/// Inputs of the analysis run.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, env = "TARGET_MONTH", default_value = DEFAULT_TARGET_MONTH)]
    pub target_month: Month,

    #[arg(long, env = "CUR_BUCKET", default_value = "your-cur-bucket-name")]
    pub cur_bucket: String,

    #[arg(long, env = "CUR_PREFIX", default_value = DEFAULT_CUR_PREFIX)]
    pub cur_prefix: String,

    #[arg(long, env = "VPC_LOGS_BUCKET", default_value = "your-vpc-logs-bucket")]
    pub vpc_logs_bucket: String,

    #[arg(long, env = "VPC_LOGS_PREFIX", default_value = DEFAULT_VPC_LOGS_PREFIX)]
    pub vpc_logs_prefix: String,

    /// Number of most expensive resources to keep
    #[arg(long, env = "TOP_N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl AnalyzeArgs {
    pub fn params(&self) -> AnalysisParams {
        AnalysisParams {
            cur_bucket: self.cur_bucket.clone(),
            cur_prefix: self.cur_prefix.clone(),
            target_month: self.target_month,
            vpc_logs_bucket: self.vpc_logs_bucket.clone(),
            vpc_logs_prefix: self.vpc_logs_prefix.clone(),
            top_n: self.top_n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        analyze: AnalyzeArgs,
    }

    #[test]
    fn parses_valid_months() {
        let m: Month = "2024-01".parse().unwrap();
        assert_eq!(m.to_string(), "2024-01");
        assert_eq!(m.first_day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let dec: Month = " 2023-12 ".parse().unwrap();
        assert_eq!(dec.to_string(), "2023-12");
    }

    #[test]
    fn rejects_malformed_months() {
        for bad in [
            "2024-13", "2024-00", "2024-1", "24-01", "2024/01", "", "abcd-ef", "2024-+1",
            "+024-01", "-024-01", "2024- 1",
        ] {
            assert!(bad.parse::<Month>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn month_contains_only_its_own_days() {
        let m: Month = "2024-02".parse().unwrap();
        assert!(m.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!m.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(!m.contains(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()));
    }

    #[test]
    fn month_serializes_as_string() {
        let m: Month = "2024-07".parse().unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"2024-07\"");
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn analyze_args_from_flags() {
        let cli = TestCli::try_parse_from([
            "test",
            "--target-month",
            "2024-03",
            "--cur-bucket",
            "billing",
            "--vpc-logs-bucket",
            "flows",
            "--top-n",
            "3",
        ])
        .unwrap();
        let params = cli.analyze.params();
        assert_eq!(params.target_month.to_string(), "2024-03");
        assert_eq!(params.cur_bucket, "billing");
        assert_eq!(params.vpc_logs_bucket, "flows");
        assert_eq!(params.top_n, 3);
    }

    #[test]
    fn analyze_args_reject_bad_month() {
        let res = TestCli::try_parse_from(["test", "--target-month", "January"]);
        assert!(res.is_err());
    }
}
