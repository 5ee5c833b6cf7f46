use tracing::{info, instrument};

use crate::book::LoanBook;
use crate::decimal::Rate;
use crate::errors::Result;
use crate::events::Event;
use crate::state::RateConfiguration;
use crate::store::LoanStore;

impl<S: LoanStore> LoanBook<S> {
    /// Current rate configuration.
    ///
    /// Creates an all-zero configuration the first time it is read.
    #[instrument(skip(self))]
    pub fn rates(&mut self) -> Result<RateConfiguration> {
        if let Some(config) = self.store.rate_configuration()? {
            return Ok(config);
        }

        let config = RateConfiguration::zero(self.now());
        self.in_transaction("rates", |store| store.save_rate_configuration(config))?;
        info!("created zero rate configuration");
        Ok(config)
    }

    /// replace all three rates; loans created earlier keep their snapshot
    #[instrument(skip_all, fields(simple = %simple, compound = %compound, late_fee = %late_fee))]
    pub fn update_rates(&mut self, simple: Rate, compound: Rate, late_fee: Rate) -> Result<RateConfiguration> {
        let now = self.now();
        let config = RateConfiguration {
            simple,
            compound,
            late_fee,
            updated_at: now,
        };

        self.in_transaction("update_rates", |store| store.save_rate_configuration(config))?;

        info!("rates updated");
        self.events.emit(Event::RatesUpdated {
            simple,
            compound,
            late_fee,
            timestamp: now,
        });
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::{LoanBook, MemoryStore, Rate, SafeTimeProvider, TimeSource};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn book() -> LoanBook<MemoryStore> {
        LoanBook::in_memory(SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )))
    }

    #[test]
    fn test_first_read_creates_zero_rates() {
        let mut book = book();
        assert!(book.store().tables().rates.is_none());

        let rates = book.rates().unwrap();
        assert!(rates.simple.is_zero() && rates.compound.is_zero() && rates.late_fee.is_zero());
        assert_eq!(book.store().tables().rates, Some(rates));

        // second read returns the stored row untouched
        book.time().test_control().unwrap().advance(Duration::days(3));
        assert_eq!(book.rates().unwrap().updated_at, rates.updated_at);
    }

    #[test]
    fn test_update_rates_replaces_all_fields() {
        let mut book = book();
        book.rates().unwrap();

        let updated = book
            .update_rates(
                Rate::from_percentage_decimal(dec!(2.5)),
                Rate::from_percentage(3),
                Rate::from_percentage(1),
            )
            .unwrap();

        assert_eq!(updated.simple.as_decimal(), dec!(0.025));
        assert_eq!(book.rates().unwrap(), updated);
        assert_eq!(book.events().len(), 1);
    }
}
