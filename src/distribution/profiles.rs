//! Pre-tabulated reference profiles.
//!
//! These tables are fixed reference data: they are never recomputed at runtime,
//! so every call returns bit-identical pmfs.
//!
//! - serial interval: Gamma(mean 4.8 d, sd 2.3 d), offsets 0..15
//! - infection-to-reporting delay: Gamma(mean 10.3 d, sd 5.4 d), offsets 0..35
//!
//! Both were discretized with midpoint intervals and truncated at 99.9% mass.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Named default profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DefaultProfile {
    /// Respiratory coronavirus parameters used by the reference dashboard.
    #[default]
    Covid19,
}

impl DefaultProfile {
    pub fn serial_interval(self) -> &'static [f64] {
        match self {
            DefaultProfile::Covid19 => &COVID19_SERIAL_INTERVAL,
        }
    }

    pub fn reporting_delay(self) -> &'static [f64] {
        match self {
            DefaultProfile::Covid19 => &COVID19_REPORTING_DELAY,
        }
    }
}

const COVID19_SERIAL_INTERVAL: [f64; 16] = [
    0.0005341075244586119,
    0.03068935049257029,
    0.1133857298667835,
    0.17771057037789276,
    0.18926035212816558,
    0.16234846885675977,
    0.12133572570913534,
    0.08243713130622266,
    0.05223043392440792,
    0.03137276711268088,
    0.018067860551775887,
    0.010057256201751838,
    0.005443164755508732,
    0.002877278975399768,
    0.0014907118635987004,
    0.0007590903528877926,
];

const COVID19_REPORTING_DELAY: [f64; 36] = [
    0.00011243779999170674,
    0.004544776625741475,
    0.01816631617668953,
    0.03674685907253395,
    0.055008761364505,
    0.06960164771668545,
    0.07911870929813408,
    0.08350668686529691,
    0.08347195791945677,
    0.0800387186935645,
    0.07426870985310965,
    0.06710826389978862,
    0.059322455773818644,
    0.05148271267496949,
    0.043983487493471134,
    0.037071900034582925,
    0.030880596668751377,
    0.025458500071965113,
    0.020796985085409635,
    0.01685074398240807,
    0.013553557023838227,
    0.010829639641952844,
    0.008601393288516201,
    0.006794375599194859,
    0.005340211798889435,
    0.004178044414999844,
    0.0032549912384632674,
    0.002525966691619307,
    0.0019531253026803166,
    0.0015051089010988746,
    0.0011562199344130489,
    0.0008855993517626096,
    0.0006764559081710361,
    0.000515371782704875,
    0.0003916947000752137,
    0.0002970173507460228,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::PMF_TOLERANCE;

    #[test]
    fn tables_are_normalized() {
        for table in [
            DefaultProfile::Covid19.serial_interval(),
            DefaultProfile::Covid19.reporting_delay(),
        ] {
            let total: f64 = table.iter().sum();
            assert!((total - 1.0).abs() < PMF_TOLERANCE, "total={total}");
            assert!(table.iter().all(|p| *p >= 0.0));
        }
    }
}
