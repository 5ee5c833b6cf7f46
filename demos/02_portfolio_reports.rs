/// portfolio reports - dashboard numbers over a file-backed book
use chrono::{Duration, TimeZone, Utc};
use loan_book_rs::{
    BookConfig, ClientDetails, InterestRegime, JsonFileStore, LoanBook, Money, NewLoan, Rate, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    println!("=== portfolio reports ===\n");

    let mut config = BookConfig::load(None)?;
    let dir = std::env::temp_dir().join("loan-book-demo");
    if config.store_path.is_none() {
        config.store_path = Some(dir.join("book.json"));
    }

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let mut book: LoanBook<JsonFileStore> = LoanBook::open(config, time)?;
    println!("book stored at {}", book.store().path().display());

    if book.loans()?.is_empty() {
        book.update_rates(Rate::from_percentage(2), Rate::from_percentage(3), Rate::from_percentage(1))?;

        let borrowers = [
            ("Ana Lima", "111.111.111-11", 1_200, InterestRegime::Simple),
            ("Bruno Alves", "222.222.222-22", 5_000, InterestRegime::Compound),
            ("Carla Souza", "333.333.333-33", 800, InterestRegime::Simple),
        ];
        let today = book.today();
        for (name, tax_id, amount, regime) in borrowers {
            let client = book.create_client(ClientDetails::new(name, tax_id))?;
            book.create_loan(NewLoan::new(client.id, Money::from_major(amount), 12, today, regime))?;
        }
    }

    // collect the first installment of every loan
    book.time().test_control().unwrap().advance(Duration::days(30));
    for loan in book.loans()? {
        if let Some(first) = book.installments_for_loan(loan.id)?.into_iter().find(|i| !i.paid) {
            book.register_payment(first.id)?;
        }
    }

    book.time().test_control().unwrap().advance(Duration::days(35));

    let dashboard = book.dashboard_indicators()?;
    println!("active loans:          {}", dashboard.active_loans);
    println!("overdue installments:  {}", dashboard.overdue_installments);
    println!("outstanding:           {}", dashboard.outstanding);
    println!("total lent:            {}", dashboard.total_lent);

    let summary = book.financial_summary()?;
    println!("\ncollected:             {}", summary.total_collected);
    println!("future interest (est): {}", summary.estimated_future_interest);

    let month = book.monthly_summary()?;
    println!("\n{}-{:02}: collected {} / pending {}", month.year, month.month, month.collected, month.pending);

    println!("\nupcoming:");
    for row in book.upcoming_due(Some(5))? {
        println!("  {} loan {} #{} due {} {}", row.client_name, row.loan_id, row.number, row.due_date, row.value);
    }

    Ok(())
}
