//! Accounts whose balances live in actor behavior state, updated from inside
//! transactions.

use std::time::Duration;

use stm_actor::{
	ActorRef, ActorSystem, BehaviorBody, BehaviorUpdate, Error, SystemConfig, Transaction, Value, current_actor, handler,
	is_tentative,
};
use tokio::sync::mpsc;

type Probe = mpsc::UnboundedSender<Value>;

/// Applies a delta without a `Context` parameter, the way library code
/// called from a handler would.
fn apply_delta(balance: i64, delta: i64) -> stm_actor::Result<()> {
	let me = current_actor().ok_or(Error::NoRunningActor)?;
	me.system().become_behavior(BehaviorUpdate::same(vec![Value::Int(balance + delta)]))
}

/// Captured state: `[balance]`. Messages: `["deposit", n]`, `["balance", reply_to]`.
fn account(probe: Probe) -> BehaviorBody {
	BehaviorBody::new(move |captured| {
		let probe = probe.clone();
		let balance = captured.first().and_then(Value::as_int).unwrap_or(0);
		handler(move |ctx, args| match args.first().and_then(Value::as_str) {
			Some("deposit") => {
				let delta = args.get(1).and_then(Value::as_int).unwrap_or(0);
				apply_delta(balance, delta)?;
				let _ = probe.send(Value::Bool(is_tentative()));
				Ok(())
			}
			Some("balance") => {
				if let Some(reply_to) = args.get(1).and_then(Value::as_actor) {
					ctx.send(reply_to, vec![Value::Int(balance)])?;
				}
				Ok(())
			}
			_ => anyhow::bail!("unknown request: {args:?}"),
		})
	})
}

fn reporter(probe: Probe) -> BehaviorBody {
	BehaviorBody::new(move |_captured| {
		let probe = probe.clone();
		handler(move |_ctx, args| {
			let _ = probe.send(args[0].clone());
			Ok(())
		})
	})
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
	tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.expect("probe timed out")
		.expect("probe closed")
}

async fn balance_of(account: &ActorRef, reporter: &ActorRef, rx: &mut mpsc::UnboundedReceiver<Value>) -> i64 {
	account.send(vec![Value::from("balance"), Value::from(reporter)]).unwrap();
	next(rx).await.as_int().expect("balance is an int")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transfers_stand_only_when_committed() {
	let _ = tracing_subscriber::fmt::try_init();
	let config = SystemConfig::from_toml_str("fault_buffer = 16").unwrap();
	let system = ActorSystem::new(config);

	let (deposits_tx, mut deposits) = mpsc::unbounded_channel();
	let (balances_tx, mut balances) = mpsc::unbounded_channel();
	let alice = system.spawn(account(deposits_tx.clone()), vec![Value::Int(100)]);
	let bob = system.spawn(account(deposits_tx), vec![Value::Int(0)]);
	let reporter = system.spawn(reporter(balances_tx), Vec::new());

	// Committed transfer.
	let txn = Transaction::begin(&system);
	txn.run(|| -> stm_actor::Result<()> {
		alice.send(vec![Value::from("deposit"), Value::Int(-30)])?;
		bob.send(vec![Value::from("deposit"), Value::Int(30)])
	})
	.unwrap();
	assert_eq!(next(&mut deposits).await, Value::Bool(true));
	assert_eq!(next(&mut deposits).await, Value::Bool(true));
	txn.commit();

	assert_eq!(balance_of(&alice, &reporter, &mut balances).await, 70);
	assert_eq!(balance_of(&bob, &reporter, &mut balances).await, 30);

	// Aborted transfer.
	let txn = Transaction::begin(&system);
	txn.run(|| -> stm_actor::Result<()> {
		alice.send(vec![Value::from("deposit"), Value::Int(-50)])?;
		bob.send(vec![Value::from("deposit"), Value::Int(50)])
	})
	.unwrap();
	assert_eq!(next(&mut deposits).await, Value::Bool(true));
	assert_eq!(next(&mut deposits).await, Value::Bool(true));
	txn.abort();

	assert_eq!(balance_of(&alice, &reporter, &mut balances).await, 70);
	assert_eq!(balance_of(&bob, &reporter, &mut balances).await, 30);
	assert_eq!(alice.stats().rolled_back, 1);

	// Plain deposit, no transaction.
	bob.send(vec![Value::from("deposit"), Value::Int(5)]).unwrap();
	assert_eq!(next(&mut deposits).await, Value::Bool(false));
	assert_eq!(balance_of(&bob, &reporter, &mut balances).await, 35);

	system.shutdown();
	assert_eq!(bob.send(vec![]), Err(Error::Interrupted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_requests_are_reported_not_fatal() {
	let system = ActorSystem::new(SystemConfig::default());
	let mut faults = system.subscribe_faults();
	let (deposits_tx, _deposits) = mpsc::unbounded_channel();
	let (balances_tx, mut balances) = mpsc::unbounded_channel();
	let acct = system.spawn(account(deposits_tx), vec![Value::Int(7)]);
	let reporter = system.spawn(reporter(balances_tx), Vec::new());

	acct.send(vec![Value::from("withdraw-everything")]).unwrap();
	let fault = tokio::time::timeout(Duration::from_secs(2), faults.recv())
		.await
		.expect("fault timed out")
		.unwrap();
	assert_eq!(fault.actor, acct.id());
	assert!(fault.message.starts_with("unknown request"));

	assert_eq!(balance_of(&acct, &reporter, &mut balances).await, 7);
}
