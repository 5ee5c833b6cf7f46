/// quick start - register a client, take out a loan, pay the first installment
use loan_book_rs::{ClientDetails, InterestRegime, LoanBook, Money, NewLoan, Rate, SafeTimeProvider, TimeSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut book = LoanBook::in_memory(SafeTimeProvider::new(TimeSource::System));

    // 2% per month simple interest, 3% compound, 1% late fee
    book.update_rates(Rate::from_percentage(2), Rate::from_percentage(3), Rate::from_percentage(1))?;

    let client = book.create_client(ClientDetails::new("Maria Silva", "123.456.789-00"))?;

    // 1,200 over 12 installments
    let today = book.today();
    let created = book.create_loan(NewLoan::new(
        client.id,
        Money::from_major(1_200),
        12,
        today,
        InterestRegime::Simple,
    ))?;

    book.register_payment(created.installments[0].id)?;

    println!("{}", book.loan_statement(created.loan.id)?.to_json_pretty()?);

    Ok(())
}
