//! The built-in sample story: one night at a lighthouse per turn.

use std::sync::Arc;

use tw_core::{AgentHandle, StaticRegistry, Template};
use tw_runtime::{EventQueue, Instance, OutputSink, RuntimeResult, TrackedEvent, done, on};

const WEATHER: [&str; 4] = ["calm", "squall", "fog", "gale"];

/// Static cast of the story.
pub struct Story {
    registry: Arc<StaticRegistry>,
    keeper: AgentHandle,
    lamp: AgentHandle,
    sea: AgentHandle,
}

/// Handles bound to one instance.
#[derive(Debug, Clone, Copy)]
pub struct Cast {
    pub keeper: AgentHandle,
    pub lamp: AgentHandle,
    pub sea: AgentHandle,
}

impl Story {
    pub fn new() -> Result<Self, String> {
        let mut registry = StaticRegistry::new();
        let keeper = registry.declare();
        let lamp = registry.declare();
        let sea = registry.add_new(Template::new("sea").with("weather", "calm"));

        registry
            .add(
                keeper,
                Template::new("keeper")
                    .with("oil", 6)
                    .with("coins", 3)
                    .with("tends", lamp.id()),
            )
            .map_err(|e| e.to_string())?;
        registry
            .add(
                lamp,
                Template::new("lamp")
                    .with("fuel", 4)
                    .with("lit", true)
                    .with("tended_by", keeper.id()),
            )
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry: Arc::new(registry),
            keeper,
            lamp,
            sea,
        })
    }

    pub fn registry(&self) -> Arc<StaticRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn bind<S: OutputSink>(&self, instance: &Instance<S>) -> RuntimeResult<Cast> {
        Ok(Cast {
            keeper: instance.bind(self.keeper)?,
            lamp: instance.bind(self.lamp)?,
            sea: instance.bind(self.sea)?,
        })
    }
}

/// The events of one turn.
pub fn turn(cast: Cast, number: u64) -> RuntimeResult<EventQueue> {
    dusk(number)
        .then(weather(cast))?
        .then(burn(cast))?
        .thenq([gulls(), watch(cast)])
}

fn dusk(number: u64) -> TrackedEvent {
    on("dusk", move |ctx| {
        ctx.say(format!("Night {number} falls over the lighthouse."));
        done()
    })
}

fn weather(cast: Cast) -> TrackedEvent {
    on("weather", move |ctx| {
        let weather = *ctx.random().choice(&WEATHER)?;
        ctx.set(cast.sea, "weather", weather)?;
        ctx.say(format!("The sea turns {weather}."));
        done()
    })
}

fn burn(cast: Cast) -> TrackedEvent {
    on("burn", move |ctx| {
        let fuel = ctx.get_int(cast.lamp, "fuel", 0)?;
        let stormy = ctx
            .get(cast.sea, "weather")?
            .is_some_and(|w| w.as_text() != Some("calm"));
        let used = ctx.random().int(1, if stormy { 3 } else { 2 })?;
        let left = (fuel - used).max(0);
        ctx.set(cast.lamp, "fuel", left)?;
        ctx.say(format!("The lamp burns {used} measure(s) of fuel."));
        if left == 0 {
            ctx.delete(cast.lamp, "lit")?;
            ctx.say("The lamp gutters out.");
        }
        if left < 2 {
            return Ok(refill(cast).into());
        }
        done()
    })
}

fn refill(cast: Cast) -> TrackedEvent {
    on("refill", move |ctx| {
        let oil = ctx.get_int(cast.keeper, "oil", 0)?;
        if oil == 0 {
            ctx.say("The keeper has no oil left.");
            return done();
        }
        let fuel = ctx.get_int(cast.lamp, "fuel", 0)?;
        let poured = oil.min(3);
        ctx.set(cast.keeper, "oil", oil - poured)?;
        ctx.set(cast.lamp, "fuel", fuel + poured)?;
        ctx.set(cast.lamp, "lit", true)?;
        ctx.say(format!("The keeper pours {poured} measure(s) of oil."));
        Ok(trade(cast).into())
    })
}

fn trade(cast: Cast) -> TrackedEvent {
    on("trade", move |ctx| {
        let coins = ctx.get_int(cast.keeper, "coins", 0)?;
        if coins > 0 && ctx.random().boolean() {
            let oil = ctx.get_int(cast.keeper, "oil", 0)?;
            ctx.set(cast.keeper, "coins", coins - 1)?;
            ctx.set(cast.keeper, "oil", oil + 2)?;
            ctx.say("A passing boat sells the keeper a flask of oil.");
        }
        done()
    })
}

fn gulls() -> TrackedEvent {
    on("gulls", |ctx| {
        if ctx.random().decimal() < 0.4 {
            let name = ctx.random().string(4, "aeiklmnorst")?;
            ctx.spawn(Template::new(format!("gull {name}")).with("hunger", 2))?;
            ctx.say(format!("A gull named {name} lands on the gallery."));
        }
        done()
    })
}

fn watch(cast: Cast) -> TrackedEvent {
    on("watch", move |ctx| {
        let lit = ctx.get(cast.lamp, "lit")?.and_then(|v| v.as_bool());
        if lit == Some(true) {
            ctx.say("The beam sweeps the water until dawn.");
        } else {
            ctx.say("The coast lies dark until dawn.");
        }
        done()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_runtime::InstanceOptions;

    #[test]
    fn a_turn_runs_in_order() {
        let story = Story::new().unwrap();
        let mut inst =
            Instance::new(story.registry(), InstanceOptions::default().with_seed("abc123")).unwrap();
        let cast = story.bind(&inst).unwrap();
        inst.invoke(turn(cast, 1).unwrap()).unwrap();

        let names: Vec<&str> = inst.history().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(&names[..3], ["dusk", "weather", "burn"]);
        assert_eq!(names[names.len() - 2..], ["gulls", "watch"]);
        assert!(!inst.output().is_empty());
    }

    #[test]
    fn templates_reference_each_other() {
        let story = Story::new().unwrap();
        let inst = Instance::new(story.registry(), InstanceOptions::default()).unwrap();
        let cast = story.bind(&inst).unwrap();
        let lamp = inst.get(cast.keeper, "tends").unwrap().and_then(|v| v.as_agent());
        assert_eq!(lamp, Some(cast.lamp.id()));
        let keeper = inst.get(cast.lamp, "tended_by").unwrap().and_then(|v| v.as_agent());
        assert_eq!(keeper, Some(cast.keeper.id()));
    }
}
