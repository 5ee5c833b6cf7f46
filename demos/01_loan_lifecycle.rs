/// loan lifecycle - edits, payments, late fees and deletion with a controlled clock
use chrono::{Duration, TimeZone, Utc};
use loan_book_rs::{
    logging, BookConfig, ClientDetails, InterestRegime, LoanBook, LoanError, Money, NewLoan, Rate, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = BookConfig::load(None)?;
    logging::init_tracing(&config.log_level)?;

    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let mut book = LoanBook::in_memory(time).with_config(config);
    book.update_rates(Rate::from_percentage(2), Rate::from_percentage(3), Rate::from_percentage(2))?;
    let client = book.create_client(ClientDetails::new("Joao Pereira", "987.654.321-00").phone("+55 11 99999-0000"))?;

    // compound loan
    let today = book.today();
    let created = book.create_loan(NewLoan::new(
        client.id,
        Money::from_major(10_000),
        12,
        today,
        InterestRegime::Compound,
    ))?;
    let loan_id = created.loan.id;
    println!("loan {} created, installment value {}", loan_id, created.installments[0].value);

    // nothing paid yet: every term can change
    let mut terms = created.loan.terms();
    terms.term = 10;
    let edited = book.edit_loan(loan_id, terms)?;
    println!("rescheduled to {} installments of {}", edited.installments.len(), edited.installments[0].value);

    // pay the first installment on time
    book.time().test_control().unwrap().advance(Duration::days(30));
    let paid = book.register_payment(edited.installments[0].id)?;
    println!("installment {} paid on {}", paid.number, book.today());

    // principal is now frozen
    terms.principal = Money::from_major(12_000);
    match book.edit_loan(loan_id, terms) {
        Err(LoanError::PrincipalLocked { .. }) => println!("principal change rejected: installments already paid"),
        other => println!("unexpected: {:?}", other.map(|s| s.loan.principal)),
    }

    // second installment is late
    book.time().test_control().unwrap().advance(Duration::days(45));
    let late = book.apply_late_fee(edited.installments[1].id, None)?;
    println!("late fee applied, installment {} now {}", late.number, late.value);

    println!("\nevents:");
    for event in book.take_events() {
        println!("  {:?}", event);
    }

    book.delete_loan(loan_id)?;
    book.delete_client(client.id)?;
    println!("\nloan and client removed");

    Ok(())
}
