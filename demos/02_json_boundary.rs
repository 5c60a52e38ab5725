/// json boundary - requests in, flat report views out
use loan_amortization_rs::analysis::{compare_loans, sensitivity_analysis, RefinanceRequest};
use loan_amortization_rs::serialization::to_json_pretty;
use loan_amortization_rs::{CalculationView, LoanDispatcher, LoanRequest};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dispatcher = LoanDispatcher::default();

    // every omitted field takes its default
    let request = LoanRequest::from_json(
        r#"{"type": "variable", "principal": 80000, "rates": "3.5, 4, 4.75", "years": 6}"#,
    )?;
    let calc = dispatcher.dispatch(&request)?;
    println!("{}", CalculationView::from_calculation(&calc).to_json_pretty()?);

    let offers: Vec<LoanRequest> = serde_json::from_str(
        r#"[
            {"name": "credit union", "rate": 5.25, "years": 30, "fees": 1500},
            {"name": "bank", "rate": 5.0, "years": 30, "fees": 6000},
            {"name": "broker", "type": "balloon", "rate": 4.5, "years": 10, "balloon": 40},
            {"name": "typo", "type": "fixd"}
        ]"#,
    )?;
    println!("{}", to_json_pretty(&compare_loans(&dispatcher, &offers))?);

    println!("{}", to_json_pretty(&sensitivity_analysis(&LoanRequest::default())?)?);

    let refinance = RefinanceRequest::from_json(r#"{"old_rate": 7, "new_rate": 5.5, "roll_costs": true}"#)?;
    println!("{}", to_json_pretty(&refinance.analyze()?)?);

    Ok(())
}
