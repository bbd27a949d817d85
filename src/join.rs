//! Join combinators over slots.
//!
//! A join runs its action whenever every participating slot holds a value:
//! once at registration if the slots are already populated, and again after
//! each later `set` on any participant. Actions must therefore be safe to
//! re-apply.

use std::rc::Rc;

use crate::slot::Slot;

type Trigger = Rc<dyn Fn()>;

fn watch<T: Clone + 'static>(slot: &Slot<T>, trigger: &Trigger) {
    let trigger = Rc::clone(trigger);
    slot.on_set(move |_| trigger());
}

/// Run `action` whenever both slots hold a value.
///
/// # Example
///
/// ```rust
/// use forgewire::{when_both, Slot};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a: Slot<u32> = Slot::new("a");
/// let b: Slot<u32> = Slot::new("b");
/// let sum = Rc::new(Cell::new(0));
///
/// let out = Rc::clone(&sum);
/// when_both(&a, &b, move |x, y| out.set(x + y));
///
/// b.set(2);
/// assert_eq!(sum.get(), 0);
/// a.set(1);
/// assert_eq!(sum.get(), 3);
/// ```
pub fn when_both<A, B, F>(a: &Slot<A>, b: &Slot<B>, action: F)
where
    A: Clone + 'static,
    B: Clone + 'static,
    F: Fn(A, B) + 'static,
{
    let (wa, wb) = (a.downgrade(), b.downgrade());
    let trigger: Trigger = Rc::new(move || {
        if let (Some(a), Some(b)) = (wa.value(), wb.value()) {
            action(a, b);
        }
    });

    watch(a, &trigger);
    watch(b, &trigger);
    trigger();
}

/// Run `action` whenever all three slots hold a value.
pub fn when_all<A, B, C, F>(a: &Slot<A>, b: &Slot<B>, c: &Slot<C>, action: F)
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    F: Fn(A, B, C) + 'static,
{
    let (wa, wb, wc) = (a.downgrade(), b.downgrade(), c.downgrade());
    let trigger: Trigger = Rc::new(move || {
        if let (Some(a), Some(b), Some(c)) = (wa.value(), wb.value(), wc.value()) {
            action(a, b, c);
        }
    });

    watch(a, &trigger);
    watch(b, &trigger);
    watch(c, &trigger);
    trigger();
}

/// Run `action` whenever all four slots hold a value.
pub fn when_all4<A, B, C, D, F>(a: &Slot<A>, b: &Slot<B>, c: &Slot<C>, d: &Slot<D>, action: F)
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    F: Fn(A, B, C, D) + 'static,
{
    let (wa, wb, wc, wd) = (a.downgrade(), b.downgrade(), c.downgrade(), d.downgrade());
    let trigger: Trigger = Rc::new(move || {
        if let (Some(a), Some(b), Some(c), Some(d)) =
            (wa.value(), wb.value(), wc.value(), wd.value())
        {
            action(a, b, c, d);
        }
    });

    watch(a, &trigger);
    watch(b, &trigger);
    watch(c, &trigger);
    watch(d, &trigger);
    trigger();
}

/// Run `action` whenever all five slots hold a value.
pub fn when_all5<A, B, C, D, E, F>(
    a: &Slot<A>,
    b: &Slot<B>,
    c: &Slot<C>,
    d: &Slot<D>,
    e: &Slot<E>,
    action: F,
) where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    E: Clone + 'static,
    F: Fn(A, B, C, D, E) + 'static,
{
    let (wa, wb, wc, wd, we) = (
        a.downgrade(),
        b.downgrade(),
        c.downgrade(),
        d.downgrade(),
        e.downgrade(),
    );
    let trigger: Trigger = Rc::new(move || {
        if let (Some(a), Some(b), Some(c), Some(d), Some(e)) =
            (wa.value(), wb.value(), wc.value(), wd.value(), we.value())
        {
            action(a, b, c, d, e);
        }
    });

    watch(a, &trigger);
    watch(b, &trigger);
    watch(c, &trigger);
    watch(d, &trigger);
    watch(e, &trigger);
    trigger();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let c = Rc::new(Cell::new(0));
        (Rc::clone(&c), c)
    }

    #[test]
    fn test_registered_after_population_fires_once() {
        let a: Slot<u8> = Slot::new("a");
        let b: Slot<u8> = Slot::new("b");
        a.set(1);
        b.set(2);

        let (calls, sink) = counter();
        when_both(&a, &b, move |_, _| sink.set(sink.get() + 1));

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_registered_before_fires_after_both_a_then_b() {
        let a: Slot<u8> = Slot::new("a");
        let b: Slot<u8> = Slot::new("b");
        let (calls, sink) = counter();
        when_both(&a, &b, move |_, _| sink.set(sink.get() + 1));

        assert_eq!(calls.get(), 0);
        a.set(1);
        assert_eq!(calls.get(), 0);
        b.set(2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_registered_before_fires_after_both_b_then_a() {
        let a: Slot<u8> = Slot::new("a");
        let b: Slot<u8> = Slot::new("b");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        when_both(&a, &b, move |x, y| sink.borrow_mut().push((x, y)));

        b.set(2);
        assert!(seen.borrow().is_empty());
        a.set(1);
        assert_eq!(*seen.borrow(), vec![(1, 2)]);
    }

    #[test]
    fn test_overwrite_after_ready_fires_again() {
        let a: Slot<u8> = Slot::new("a");
        let b: Slot<u8> = Slot::new("b");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        when_both(&a, &b, move |x, y| sink.borrow_mut().push((x, y)));

        a.set(1);
        b.set(2);
        a.set(3);

        assert_eq!(*seen.borrow(), vec![(1, 2), (3, 2)]);
    }

    #[test]
    fn test_when_all_any_order() {
        let orders: [[usize; 3]; 3] = [[0, 1, 2], [2, 1, 0], [1, 2, 0]];
        for order in orders {
            let slots: [Slot<u8>; 3] = [Slot::new("a"), Slot::new("b"), Slot::new("c")];
            let (calls, sink) = counter();
            when_all(&slots[0], &slots[1], &slots[2], move |_, _, _| {
                sink.set(sink.get() + 1)
            });

            for (step, idx) in order.iter().enumerate() {
                assert_eq!(calls.get(), 0, "fired early at step {step}");
                slots[*idx].set(1);
            }
            assert_eq!(calls.get(), 1);
        }
    }

    #[test]
    fn test_when_all4_and_when_all5() {
        let s: Vec<Slot<u32>> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(Slot::new)
            .collect();

        let four = Rc::new(Cell::new(0));
        let five = Rc::new(Cell::new(0));

        let sink4 = Rc::clone(&four);
        when_all4(&s[0], &s[1], &s[2], &s[3], move |a, b, c, d| {
            sink4.set(a + b + c + d)
        });
        let sink5 = Rc::clone(&five);
        when_all5(&s[0], &s[1], &s[2], &s[3], &s[4], move |a, b, c, d, e| {
            sink5.set(a + b + c + d + e)
        });

        for (i, slot) in s.iter().enumerate() {
            slot.set(i as u32 + 1);
        }

        assert_eq!(four.get(), 1 + 2 + 3 + 4);
        assert_eq!(five.get(), 1 + 2 + 3 + 4 + 5);
    }

    #[test]
    fn test_mixed_value_types() {
        let name: Slot<String> = Slot::new("name");
        let port: Slot<u16> = Slot::new("port");
        let out = Rc::new(RefCell::new(String::new()));

        let sink = Rc::clone(&out);
        when_both(&name, &port, move |n, p| *sink.borrow_mut() = format!("{n}:{p}"));

        port.set(8080);
        name.set("app".to_string());

        assert_eq!(*out.borrow(), "app:8080");
    }
}
