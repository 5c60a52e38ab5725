/// prepayment - compare extra-payment frequencies and a lump sum
use loan_amortization_rs::{
    FrequencySelection, LoanSpec, Money, PrepaymentSimulator, Rate,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let spec = LoanSpec::fixed(Money::from_major(300_000), Rate::from_percent(dec!(5.75)), 30);
    let simulator = PrepaymentSimulator::new(&spec)?;

    let analysis = simulator.analyze(Money::from_major(250), 13, FrequencySelection::All)?;

    println!("=== prepayment analysis ===\n");
    println!(
        "baseline: ${} monthly, ${} interest over {} months\n",
        analysis.original.monthly_payment,
        analysis.original.total_interest,
        analysis.original.total_months
    );

    for scenario in &analysis.scenarios {
        println!(
            "{:<9} {:>3} months ({:>3} saved)  saves ${:>10}  payback {}",
            scenario.frequency.as_str(),
            scenario.total_months,
            scenario.months_saved,
            scenario.interest_savings,
            scenario.payback_period
        );
    }

    println!("\noptimal monthly extras:");
    for candidate in &analysis.optimal_prepayments {
        println!(
            "  ${:>8}  saves ${:>10}  roi {:>7}%  {:?}",
            candidate.prepayment_amount,
            candidate.interest_savings,
            candidate.roi_percent,
            candidate.efficiency
        );
    }

    let lump = simulator.lump_sum(Money::from_major(20_000), 60)?;
    println!(
        "\nlump sum of ${} in month {}: new payment ${}, saves ${}",
        lump.lump_sum_amount, lump.lump_sum_month, lump.new_monthly_payment, lump.interest_savings
    );

    Ok(())
}
