/// quick start - build a fixed-rate schedule and print its summary
use loan_amortization_rs::{LoanDispatcher, LoanSpec, Money, Rate};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // $250,000 over 30 years at 6.5% with $4,000 in fees
    let spec = LoanSpec::fixed(Money::from_major(250_000), Rate::from_percent(dec!(6.5)), 30)
        .with_fees(Money::from_major(4_000));

    let calc = LoanDispatcher::default().build(&spec)?;
    let summary = &calc.summary;

    println!("=== fixed-rate loan ===\n");
    if let Some(payment) = summary.monthly_payment {
        println!("monthly payment: ${}", payment);
    }
    println!("total paid:      ${}", summary.total_paid);
    println!("total interest:  ${}", summary.total_interest);
    println!("true apr:        {}", summary.apr);

    println!("\nfirst year:");
    for period in calc.schedule.iter().take(12) {
        println!(
            "  {:>3}  payment {:>9}  interest {:>9}  principal {:>9}  balance {:>11}",
            period.index, period.payment, period.interest, period.principal_paid, period.balance_after
        );
    }

    Ok(())
}
